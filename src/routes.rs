//! The five post routes.
//!
//! | Method | Path | Success |
//! |---|---|---|
//! | `POST` | `/posts` | the created post |
//! | `GET` | `/posts` | every post |
//! | `GET` | `/posts/{postId}` | the post, or a miss |
//! | `PUT` | `/posts/{postId}` | the request body, echoed as received |
//! | `DELETE` | `/posts/{postId}` | the post as it was before removal, or a miss |
//!
//! A miss is answered according to [`NotFoundPolicy`]. Every store failure is
//! a single `500` response whose body is the error object.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::post::Post;
use crate::request::{BodyError, Request};
use crate::response::{IntoResponse, Json, Response};
use crate::router::Router;
use crate::state::AppState;
use crate::status::Status;
use crate::store::{Lookup, StoreError};

const POST_ID: &str = "postId";

/// Builds the router serving all post routes over `state`.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new(state)
        .post("/posts", create_post)
        .get("/posts", list_posts)
        .get("/posts/{postId}", read_post)
        .put("/posts/{postId}", update_post)
        .delete("/posts/{postId}", delete_post)
}

// ── Not-found policy ──────────────────────────────────────────────────────────

/// How an id that matches no post is reported.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum NotFoundPolicy {
    /// `200 OK` with a JSON `null` body. Update still echoes its body.
    #[default]
    Null,
    /// `404 Not Found` with a JSON `null` body, for reads, updates, and deletes.
    Status404,
}

impl NotFoundPolicy {
    fn missing(self) -> Response {
        match self {
            Self::Null => Json(Value::Null).into_response(),
            Self::Status404 => Json(Value::Null).with_status(Status::NotFound),
        }
    }
}

#[derive(Debug, Error)]
#[error("expected `null` or `404`, got `{0}`")]
pub struct UnknownPolicy(String);

impl FromStr for NotFoundPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(Self::Null),
            "404" => Ok(Self::Status404),
            other => Err(UnknownPolicy(other.to_owned())),
        }
    }
}

impl fmt::Display for NotFoundPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Null => "null",
            Self::Status404 => "404",
        })
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Body(#[from] BodyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Body(e) => Response::builder().status(Status::BadRequest).text(e.to_string()),
            Self::Store(e) => {
                warn!(error = e.name(), "store operation failed: {e}");
                Json(e.to_json()).with_status(Status::InternalServerError)
            }
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

fn post_id(req: &Request) -> &str {
    req.param(POST_ID).unwrap_or_default()
}

fn found_or_missing(state: &AppState, lookup: Lookup<Post>) -> Response {
    match lookup {
        Lookup::Found(post) => Json(post).into_response(),
        Lookup::NotFound => state.not_found.missing(),
    }
}

// POST /posts
async fn create_post(state: AppState, req: Request) -> Result<Json<Post>, ApiError> {
    let attributes = req.json_body()?;
    Ok(Json(state.store.create(attributes).await?))
}

// GET /posts
async fn list_posts(state: AppState, _req: Request) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(state.store.find_all().await?))
}

// GET /posts/{postId}
async fn read_post(state: AppState, req: Request) -> Result<Response, ApiError> {
    let lookup = state.store.find_by_id(post_id(&req)).await?;
    Ok(found_or_missing(&state, lookup))
}

// PUT /posts/{postId}
//
// Answers with the caller's own body, not the stored document.
async fn update_post(state: AppState, req: Request) -> Result<Response, ApiError> {
    let body = req.json_body()?;
    let outcome = state.store.update_by_id(post_id(&req), body.clone()).await?;
    Ok(match outcome {
        Lookup::NotFound if state.not_found == NotFoundPolicy::Status404 => state.not_found.missing(),
        Lookup::Found(()) | Lookup::NotFound => Json(body).into_response(),
    })
}

// DELETE /posts/{postId}
async fn delete_post(state: AppState, req: Request) -> Result<Response, ApiError> {
    let lookup = state.store.delete_by_id(post_id(&req)).await?;
    Ok(found_or_missing(&state, lookup))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::method::Method;
    use crate::store::{ConnectionStatus, MemoryStore};

    fn app(policy: NotFoundPolicy) -> Router<AppState> {
        let state = AppState::new(Arc::new(MemoryStore::new()), ConnectionStatus::Connected)
            .with_not_found(policy);
        router(state)
    }

    async fn call(app: &Router<AppState>, method: Method, path: &str, body: Option<Value>) -> (Status, Value) {
        let headers = vec![("content-type".to_owned(), "application/json".to_owned())];
        let body = body.map(|b| Bytes::from(b.to_string())).unwrap_or_default();
        let res = app.handle(method, path.to_owned(), headers, body).await;
        let value = if res.body().is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(res.body()).unwrap_or_else(|_| json!(String::from_utf8_lossy(res.body())))
        };
        (res.status_code(), value)
    }

    #[test]
    fn policy_parses_from_config_values() {
        assert_eq!("null".parse::<NotFoundPolicy>().unwrap(), NotFoundPolicy::Null);
        assert_eq!("404".parse::<NotFoundPolicy>().unwrap(), NotFoundPolicy::Status404);
        assert!("gone".parse::<NotFoundPolicy>().is_err());
        assert_eq!(NotFoundPolicy::Status404.to_string(), "404");
    }

    #[tokio::test]
    async fn update_echoes_request_body_verbatim() {
        let app = app(NotFoundPolicy::Null);
        let (_, created) = call(&app, Method::Post, "/posts", Some(json!({"title": "A", "body": "B"}))).await;
        let path = format!("/posts/{}", created["_id"].as_str().unwrap());

        let (status, echoed) = call(&app, Method::Put, &path, Some(json!({"title": "C", "zz": 1, "aa": 2}))).await;
        assert_eq!(status, Status::Ok);
        assert_eq!(echoed, json!({"title": "C", "zz": 1, "aa": 2}));

        let (_, stored) = call(&app, Method::Get, &path, None).await;
        assert_eq!(stored["title"], "C");
        assert_eq!(stored["body"], "B");
        assert!(stored.get("zz").is_none());
    }

    #[tokio::test]
    async fn misses_follow_the_policy() {
        let missing = "/posts/65f1c2a4e13b7d0012ab34cd";

        let compat = app(NotFoundPolicy::Null);
        assert_eq!(call(&compat, Method::Get, missing, None).await, (Status::Ok, Value::Null));
        assert_eq!(call(&compat, Method::Delete, missing, None).await, (Status::Ok, Value::Null));
        assert_eq!(
            call(&compat, Method::Put, missing, Some(json!({"title": "X"}))).await,
            (Status::Ok, json!({"title": "X"}))
        );

        let strict = app(NotFoundPolicy::Status404);
        assert_eq!(call(&strict, Method::Get, missing, None).await, (Status::NotFound, Value::Null));
        assert_eq!(call(&strict, Method::Delete, missing, None).await, (Status::NotFound, Value::Null));
        assert_eq!(
            call(&strict, Method::Put, missing, Some(json!({"title": "X"}))).await,
            (Status::NotFound, Value::Null)
        );
    }

    #[tokio::test]
    async fn malformed_id_is_a_server_error_with_error_body() {
        let app = app(NotFoundPolicy::Null);
        let (status, body) = call(&app, Method::Get, "/posts/nope", None).await;
        assert_eq!(status, Status::InternalServerError);
        assert_eq!(body["name"], "CastError");
        assert_eq!(body["value"], "nope");
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let app = app(NotFoundPolicy::Null);
        let headers = vec![("content-type".to_owned(), "application/json".to_owned())];
        let res = app.handle(Method::Post, "/posts".into(), headers, Bytes::from_static(b"{\"title\"")).await;
        assert_eq!(res.status_code(), Status::BadRequest);
    }
}
