use crate::api::auth::{authenticate, AuthError};
use crate::api::AppState;
use crate::settings::PutError;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Success response for a settings write
#[derive(Serialize)]
pub(crate) struct WrittenResponse {
    written: i64,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// GET /settings - Fetch the stored settings blob
///
/// Responds 304 without a body when If-None-Match carries the current
/// ETag; any other value (or none) gets the full blob.
pub(crate) async fn get_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = authenticate(&headers, &state.secrets, state.allowed_users.as_ref()).await?;

    let record = state.settings.get(&user.id).await.map_err(|e| {
        error!(error = %e, "Failed to load settings");
        AppError::StoreFailed
    })?;

    let record = record.ok_or(AppError::NotFound)?;
    let etag = record.written.to_string();

    // Only an exact tag match lets the client skip the body
    if let Some(tag) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    {
        if tag == etag {
            return Ok(StatusCode::NOT_MODIFIED.into_response());
        }
    }

    Ok((
        StatusCode::OK,
        [
            (header::ETAG, etag),
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        ],
        record.value,
    )
        .into_response())
}

/// HEAD /settings - Presence probe: ETag without the body
///
/// Reads only the timestamp; the blob itself never leaves the store.
pub(crate) async fn head_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = authenticate(&headers, &state.secrets, state.allowed_users.as_ref()).await?;

    let written = state.settings.written(&user.id).await.map_err(|e| {
        error!(error = %e, "Failed to load settings");
        AppError::StoreFailed
    })?;

    match written {
        Some(written) => {
            Ok((StatusCode::NO_CONTENT, [(header::ETAG, written.to_string())]).into_response())
        }
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// PUT /settings - Replace the stored settings blob
pub(crate) async fn put_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WrittenResponse>, AppError> {
    let user = authenticate(&headers, &state.secrets, state.allowed_users.as_ref()).await?;

    // Blobs are opaque bytes; the content type must say so, exactly
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if content_type != Some("application/octet-stream") {
        return Err(AppError::WrongContentType);
    }

    let written = state
        .settings
        .put(&user.id, &body)
        .await
        .map_err(|e| match e {
            PutError::TooLarge { .. } => AppError::TooLarge,
            PutError::Store(e) => {
                error!(error = %e, "Failed to store settings");
                AppError::StoreFailed
            }
        })?;

    info!(bytes = body.len(), "Settings stored");

    Ok(Json(WrittenResponse { written }))
}

/// DELETE /settings - Drop the stored settings blob
///
/// Responds 204 whether or not anything was stored.
pub(crate) async fn delete_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let user = authenticate(&headers, &state.secrets, state.allowed_users.as_ref()).await?;

    state.settings.delete(&user.id).await.map_err(|e| {
        error!(error = %e, "Failed to delete settings");
        AppError::StoreFailed
    })?;

    info!("Settings deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Application error types
#[derive(Debug)]
pub(crate) enum AppError {
    Auth(AuthError),
    NotFound,
    WrongContentType,
    TooLarge,
    StoreFailed,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Auth(e) => (
                match e {
                    AuthError::Missing | AuthError::Invalid => StatusCode::UNAUTHORIZED,
                    AuthError::NotAllowed => StatusCode::FORBIDDEN,
                    AuthError::StoreFailed => StatusCode::INTERNAL_SERVER_ERROR,
                },
                e.to_string(),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "No settings currently synchronized".to_string(),
            ),
            AppError::WrongContentType => (
                StatusCode::BAD_REQUEST,
                "Content type must be `application/octet-stream`".to_string(),
            ),
            AppError::TooLarge => (StatusCode::BAD_REQUEST, "Settings are too large".to_string()),
            AppError::StoreFailed => (
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

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}
