// HTTP API: settings sync, OAuth exchange, liveness

pub mod auth;
pub mod oauth;
mod settings;

pub use oauth::ProviderConfig;

use crate::secrets::SecretStore;
use crate::settings::SettingsStore;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ETAG, IF_NONE_MATCH, ORIGIN},
        HeaderValue, Method,
    },
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state
///
/// Built once from the validated configuration and immutable afterwards;
/// all cross-request state lives behind the stores.
#[derive(Clone)]
pub struct AppState {
    pub secrets: Arc<SecretStore>,
    pub settings: Arc<SettingsStore>,
    pub provider: ProviderConfig,
    pub allowed_users: Option<HashSet<String>>,
}

/// Create the application router
pub fn create_router(state: AppState, cors_origins: Option<&[String]>) -> Router {
    // The framework limit sits above our own so an oversize blob still
    // reaches the handler and gets the documented 400, not a bare 413
    let body_limit = state.settings.size_limit().saturating_add(4096);

    Router::new()
        .route("/", get(ping))
        .route(
            "/settings",
            get(settings::get_settings)
                .head(settings::head_settings)
                .put(settings::put_settings)
                .delete(settings::delete_settings),
        )
        .route("/authorize", get(oauth::authorize))
        .route("/callback", get(oauth::callback))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(cors_origins))
        .with_state(Arc::new(state))
}

/// Build the CORS layer: explicit origins when configured, any otherwise.
///
/// ETag is exposed so browser clients can hold onto it for If-None-Match.
fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::HEAD, Method::PUT, Method::DELETE])
        .allow_headers(vec![ACCEPT, AUTHORIZATION, CONTENT_TYPE, IF_NONE_MATCH, ORIGIN])
        .expose_headers(vec![ETAG]);

    match origins {
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring unparseable CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(parsed)
        }
        None => layer.allow_origin(Any),
    }
}

/// GET / - Liveness marker
async fn ping() -> Json<Value> {
    Json(json!({ "ping": "pong" }))
}
