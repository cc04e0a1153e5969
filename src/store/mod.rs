//! Post persistence.
//!
//! [`PostStore`] is the seam between the HTTP routes and whatever holds the
//! documents. Every operation returns a boxed future so the routes can hold
//! any backend as `Arc<dyn PostStore>`:
//!
//! - [`MongoStore`]: one collection in a MongoDB database.
//! - [`MemoryStore`]: an in-process `Vec`, same semantics, no server needed.
//!
//! Misses are never errors. A well-formed id that matches nothing comes back
//! as [`Lookup::NotFound`]; a malformed id is a [`StoreError`].

mod memory;
mod mongo;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::post::Post;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// URL scheme that selects the in-process store instead of MongoDB.
pub const MEMORY_URL_SCHEME: &str = "memory:";

/// A heap-allocated, type-erased future borrowed from the store.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ── Lookup ────────────────────────────────────────────────────────────────────

/// Result of addressing a single document by id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotFound, Self::Found)
    }
}

// ── StoreError ────────────────────────────────────────────────────────────────

/// Any failure surfaced by the persistence layer.
///
/// No distinction is drawn between caller mistakes (a malformed id) and
/// server trouble (a lost connection): the routes answer all of them with
/// `500` and [`StoreError::to_json`] as the body.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cast to ObjectId failed for value \"{value}\" at path \"_id\"")]
    InvalidId { value: String },

    #[error("Cast to string failed for value {value} at path \"{path}\"")]
    Cast { path: &'static str, value: Value },

    #[error("database connection unavailable: {reason}")]
    Disconnected { reason: String },

    #[error("{0}")]
    Driver(#[from] mongodb::error::Error),
}

impl StoreError {
    /// Short class name, as it appears in the `name` field of the JSON body.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidId { .. } | Self::Cast { .. } => "CastError",
            Self::Disconnected { .. } => "ConnectionError",
            Self::Driver(_) => "MongoError",
        }
    }

    /// The error object as sent to HTTP clients. Not a stable contract.
    pub fn to_json(&self) -> Value {
        let message = self.to_string();
        match self {
            Self::InvalidId { value } => json!({
                "name": self.name(),
                "message": message,
                "kind": "ObjectId",
                "value": value,
                "path": "_id",
            }),
            Self::Cast { path, value } => json!({
                "name": self.name(),
                "message": message,
                "kind": "string",
                "value": value,
                "path": path,
            }),
            Self::Disconnected { .. } => json!({
                "name": self.name(),
                "message": message,
            }),
            Self::Driver(e) => {
                let mut labels: Vec<&String> = e.labels().iter().collect();
                labels.sort();
                json!({
                    "name": self.name(),
                    "message": message,
                    "labels": labels,
                })
            }
        }
    }
}

// ── Connection state ──────────────────────────────────────────────────────────

/// Outcome of the one connection attempt made at startup.
///
/// A snapshot: it is never updated afterwards, so a store that reports
/// `Failed` may still serve requests once the driver reaches the server
/// later. Held in the application state for diagnostics; no route exposes it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Failed(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ── PostStore ─────────────────────────────────────────────────────────────────

/// Operations on the post collection.
///
/// `attributes` and `fields` are raw request JSON. Implementations cast them
/// with [`PostFields::cast`](crate::post::PostFields::cast); nothing upstream
/// validates them.
pub trait PostStore: Send + Sync {
    /// Inserts a new post under a freshly generated id.
    fn create(&self, attributes: Value) -> BoxFuture<'_, Result<Post, StoreError>>;

    /// Every post, in the store's natural order.
    fn find_all(&self) -> BoxFuture<'_, Result<Vec<Post>, StoreError>>;

    fn find_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Lookup<Post>, StoreError>>;

    /// Merges the supplied `title`/`body` into an existing post. A miss is a
    /// silent no-op reported as [`Lookup::NotFound`].
    fn update_by_id<'a>(
        &'a self,
        id: &'a str,
        fields: Value,
    ) -> BoxFuture<'a, Result<Lookup<()>, StoreError>>;

    /// Removes a post, returning it as it was just before removal.
    fn delete_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Lookup<Post>, StoreError>>;
}

/// Opens the store named by `config.url`.
///
/// `memory:` selects [`MemoryStore`]; anything else is handed to
/// [`MongoStore::connect`]. A failed connection is reported in the returned
/// status, never as an error: the service starts regardless.
pub async fn open(config: &DatabaseConfig) -> (Arc<dyn PostStore>, ConnectionStatus) {
    if config.url.starts_with(MEMORY_URL_SCHEME) {
        info!("using in-memory post store");
        return (Arc::new(MemoryStore::new()), ConnectionStatus::Connected);
    }

    let (store, status) = MongoStore::connect(config).await;
    (Arc::new(store), status)
}
