use std::sync::Arc;

use crate::routes::NotFoundPolicy;
use crate::store::{ConnectionStatus, PostStore};

/// Everything a route handler needs, cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PostStore>,
    pub connection: ConnectionStatus,
    pub not_found: NotFoundPolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn PostStore>, connection: ConnectionStatus) -> Self {
        Self { store, connection, not_found: NotFoundPolicy::default() }
    }

    pub fn with_not_found(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found = policy;
        self
    }
}
