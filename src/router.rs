//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. You register a path, you
//! get a handler, and every handler receives a clone of the router's state.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally.
pub struct Router<S> {
    routes: HashMap<Method, MatchitRouter<BoxedHandler<S>>>,
    state: S,
}

impl<S> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// An empty router whose handlers all share `state`.
    pub fn new(state: S) -> Self {
        Self { routes: HashMap::new(), state }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler<S>) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler<S>) -> Self {
        self.on(Method::Delete, path, handler)
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler<S>, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Routes one fully-buffered request. Unmatched paths get `404 Not Found`.
    ///
    /// Matching is not strict about one trailing slash: `/posts/` reaches the
    /// `/posts` route.
    pub(crate) async fn handle(
        &self,
        method: Method,
        path: String,
        headers: Vec<(String, String)>,
        body: bytes::Bytes,
    ) -> Response {
        let matched = self.lookup(method, &path).or_else(|| {
            let trimmed = path.strip_suffix('/').filter(|p| !p.is_empty())?;
            self.lookup(method, trimmed)
        });
        match matched {
            Some((handler, params)) => {
                let req = Request::new(method, path, headers, body, params);
                handler.call(self.state.clone(), req).await
            }
            None => Response::status(Status::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    async fn echo_param(prefix: &'static str, req: Request) -> String {
        format!("{prefix}:{}", req.param("id").unwrap_or("none"))
    }

    fn router() -> Router<&'static str> {
        Router::new("state")
            .get("/items/{id}", echo_param)
            .delete("/items/{id}", |_: &'static str, _: Request| async { Status::Ok })
    }

    #[tokio::test]
    async fn dispatches_with_state_and_params() {
        let res = router().handle(Method::Get, "/items/7".into(), vec![], Bytes::new()).await;
        assert_eq!(res.status_code(), Status::Ok);
        assert_eq!(res.body(), b"state:7");
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let res = router().handle(Method::Get, "/nope".into(), vec![], Bytes::new()).await;
        assert_eq!(res.status_code(), Status::NotFound);
    }

    #[tokio::test]
    async fn one_trailing_slash_is_ignored() {
        let res = router().handle(Method::Get, "/items/7/".into(), vec![], Bytes::new()).await;
        assert_eq!(res.status_code(), Status::Ok);
        assert_eq!(res.body(), b"state:7");

        let res = router().handle(Method::Get, "/items/7//".into(), vec![], Bytes::new()).await;
        assert_eq!(res.status_code(), Status::NotFound);
    }

    #[tokio::test]
    async fn unregistered_method_is_not_found() {
        let res = router().handle(Method::Put, "/items/7".into(), vec![], Bytes::new()).await;
        assert_eq!(res.status_code(), Status::NotFound);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic() {
        let _ = router().get("/items/{other}", echo_param);
    }
}
