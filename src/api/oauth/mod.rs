//! OAuth identity exchange: the only way to obtain a settings secret.
//!
//! Implements the authorization code flow:
//! 1. GET /authorize → 302 to the provider's consent screen
//! 2. User approves; the provider redirects back with ?code=...
//! 3. GET /callback exchanges the code for the user's identity
//! 4. The secret for that identity is issued, or the existing one returned
//!
//! The flow is stateless: no CSRF state parameter is minted or checked,
//! and the authorize URL is identical for every request.

mod exchange;
mod provider;

pub use provider::ProviderConfig;

use crate::api::AppState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use exchange::ExchangeError;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Application error types for OAuth endpoints
pub(crate) enum AppError {
    MissingCode,
    InvalidCode,
    NotAllowed,
    TokenRequestFailed,
    IdentityFetchFailed,
    IssuanceFailed,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::MissingCode => (StatusCode::BAD_REQUEST, "Missing code".to_string()),
            AppError::InvalidCode => (StatusCode::BAD_REQUEST, "Invalid code".to_string()),
            AppError::NotAllowed => {
                (StatusCode::FORBIDDEN, "User is not whitelisted".to_string())
            }
            AppError::TokenRequestFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to request access token".to_string(),
            ),
            AppError::IdentityFetchFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to get user".to_string(),
            ),
            AppError::IssuanceFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

/// Callback query parameters
#[derive(Deserialize)]
pub(crate) struct CallbackQuery {
    code: Option<String>,
}

/// Issued secret response
#[derive(Serialize)]
pub(crate) struct SecretResponse {
    secret: String,
}

/// GET /authorize - Redirect to the provider's consent screen
pub(crate) async fn authorize(State(state): State<Arc<AppState>>) -> Response {
    let url = state.provider.build_authorize_url();

    // Plain 302; Redirect::temporary would send 307
    (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
}

/// GET /callback?code=... - Exchange the code and hand out the secret
///
/// Running the flow again for the same user returns the same secret:
/// issuance never overwrites, so sessions on other devices stay valid.
pub(crate) async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<SecretResponse>, AppError> {
    // Absent and empty are the same thing here
    let code = match query.code {
        Some(code) if !code.is_empty() => code,
        _ => return Err(AppError::MissingCode),
    };

    let identity = exchange::exchange_code(&state.provider, &code)
        .await
        .map_err(|e| match e {
            ExchangeError::InvalidCode => {
                warn!("Provider rejected the authorization code");
                AppError::InvalidCode
            }
            ExchangeError::TokenRequestFailed(msg) => {
                error!(error = %msg, "Token request failed");
                AppError::TokenRequestFailed
            }
            ExchangeError::IdentityFetchFailed(msg) => {
                error!(error = %msg, "Identity fetch failed");
                AppError::IdentityFetchFailed
            }
        })?;

    // The allow-list gates issuance, not just settings access
    if let Some(allowed) = &state.allowed_users {
        if !allowed.contains(&identity) {
            warn!("OAuth exchange completed for an identity outside the allow-list");
            return Err(AppError::NotAllowed);
        }
    }

    let secret = state.secrets.issue_or_get(&identity).await.map_err(|e| {
        error!(error = %e, "Secret issuance failed");
        AppError::IssuanceFailed
    })?;

    info!("Issued settings secret via OAuth exchange");

    Ok(Json(SecretResponse { secret }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_query_deserialization() {
        // Success case
        let query = "code=auth_code_123";
        let callback: CallbackQuery = serde_urlencoded::from_str(query).unwrap();
        assert_eq!(callback.code, Some("auth_code_123".to_string()));

        // No code at all
        let callback: CallbackQuery = serde_urlencoded::from_str("").unwrap();
        assert_eq!(callback.code, None);

        // Unrelated parameters are ignored
        let query = "error=access_denied&error_description=User+cancelled";
        let callback: CallbackQuery = serde_urlencoded::from_str(query).unwrap();
        assert_eq!(callback.code, None);
    }

    #[test]
    fn test_secret_response_serialization() {
        let response = SecretResponse {
            secret: "cafe0123".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, "{\"secret\":\"cafe0123\"}");
    }
}
