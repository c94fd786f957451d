// Integration tests for the server loop.
//
// The graceful-shutdown future must stay pending until shutdown is actually
// requested. A future that resolves early walks the server straight out of
// the accept loop: it binds, logs, and exits without serving a request.

use std::sync::Arc;

use axum::Router;
use tokio::sync::oneshot;

use stratus::api::{create_router, AppState, ProviderConfig};
use stratus::secrets::SecretStore;
use stratus::settings::SettingsStore;
use stratus::store::{KvStore, MemoryStore};

fn create_test_app() -> Router {
    let kv: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let state = AppState {
        secrets: Arc::new(SecretStore::new(Arc::clone(&kv), "pepper-one")),
        settings: Arc::new(SettingsStore::new(kv, "pepper-two", 1024)),
        provider: ProviderConfig {
            client_id: "cid".to_string(),
            client_secret: "cs".to_string(),
            redirect_uri: "https://sync.example.com/callback".to_string(),
            ..ProviderConfig::default()
        },
        allowed_users: None,
    };
    create_router(state, None)
}

/// Requests are served over real TCP while the shutdown future is pending;
/// the serve call returns only once it resolves
#[tokio::test]
async fn test_serves_until_shutdown_resolves() {
    let app = create_test_app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    // Still accepting: a request on the bound port gets the liveness body
    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["ping"], "pong");

    // Only now may the server wind down
    shutdown_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
