//! Shared helpers: a real server on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;

use posts_service::{AppState, ConnectionStatus, MemoryStore, NotFoundPolicy, PostStore, Server, routes};
use tokio::sync::oneshot;

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Serves the post routes over a fresh in-memory store.
#[allow(dead_code)]
pub async fn spawn_memory_app() -> TestApp {
    spawn_app(Arc::new(MemoryStore::new()), ConnectionStatus::Connected, NotFoundPolicy::Null).await
}

pub async fn spawn_app(
    store: Arc<dyn PostStore>,
    connection: ConnectionStatus,
    policy: NotFoundPolicy,
) -> TestApp {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let state = AppState::new(store, connection).with_not_found(policy);
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let signal = async {
            let _ = rx.await;
        };
        server.serve_with_shutdown(routes::router(state), signal).await.unwrap();
    });

    TestApp { addr, client: reqwest::Client::new(), shutdown: Some(tx) }
}
