//! # posts-service
//!
//! A JSON CRUD service for a single `post` resource stored in MongoDB.
//!
//! ## Routes
//!
//! - `POST /posts` creates a post from the JSON body
//! - `GET /posts` lists every post
//! - `GET /posts/{postId}` reads one post
//! - `PUT /posts/{postId}` merges `title`/`body` into a post and echoes the body
//! - `DELETE /posts/{postId}` removes a post and returns it
//!
//! Request bodies are not validated. An id that matches nothing is answered
//! with `200 null` by default (see [`NotFoundPolicy`]), and every store
//! failure is a `500` carrying the error object as JSON.
//!
//! ## Layout
//!
//! The HTTP layer is a small hyper-based framework: [`Router`] holds one
//! radix tree per [`Method`], [`Server`] runs the accept loop with graceful
//! shutdown, and handlers are plain `async fn(state, Request)`. Persistence
//! sits behind [`PostStore`], with [`MongoStore`] for production and
//! [`MemoryStore`] for tests and local runs.
//!
//! ```rust,no_run
//! use posts_service::{Config, run};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), posts_service::Error> {
//!     run(Config::load()?).await
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod config;
pub mod post;
pub mod routes;
pub mod state;
pub mod store;

use std::net::{Ipv4Addr, SocketAddr};

use tracing::{debug, info};

pub use config::Config;
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use post::{Post, PostId};
pub use request::{BodyError, Request};
pub use response::{IntoResponse, Json, Response};
pub use router::Router;
pub use routes::NotFoundPolicy;
pub use server::{DEFAULT_BODY_LIMIT, Server};
pub use state::AppState;
pub use status::Status;
pub use store::{ConnectionStatus, Lookup, MemoryStore, MongoStore, PostStore, StoreError};

/// Binds `0.0.0.0:{port}`, connects the store, and serves the post routes
/// until SIGTERM or Ctrl-C.
///
/// A failed database connection does not stop startup: requests are still
/// accepted and fail with `500` once they reach the store.
pub async fn run(config: Config) -> Result<(), Error> {
    let server = Server::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port))).await?;
    let port = server.local_addr()?.port();

    let (store, connection) = store::open(&config.database).await;
    let state = AppState::new(store, connection).with_not_found(config.not_found);
    debug!(connection = ?state.connection, not_found = %state.not_found, "store ready");

    info!("posts-service listening on port {port}");
    server.serve(routes::router(state)).await
}
