use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::collections::HashSet;
use tracing::error;

use crate::secrets::SecretStore;


/// The identity authentication vouched for on this request.
///
/// Handlers receive this by value and thread it into the stores
/// explicitly; nothing about the request itself is mutated along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthedUser {
    pub id: String,
}

/// Authentication errors
#[derive(Debug, PartialEq)]
pub enum AuthError {
    /// No Authorization header on the request
    Missing,
    /// Undecodable header, unknown identity, or wrong secret. One variant
    /// on purpose: responses must not reveal which identities exist.
    Invalid,
    /// Identity verified against the header but not on the allow-list
    NotAllowed,
    /// Secret lookup hit a store failure
    StoreFailed,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Missing => write!(f, "Missing authorization"),
            AuthError::Invalid => write!(f, "Invalid authorization"),
            AuthError::NotAllowed => write!(f, "User is not whitelisted"),
            AuthError::StoreFailed => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Decode `base64(identity:secret)` from the Authorization header.
///
/// The scheme is Basic-shaped but bare: no `Basic ` prefix, and the
/// credential is an issued secret rather than a password.
///
/// # Flow
/// 1. Read the raw Authorization header value
/// 2. Base64-decode it (standard alphabet)
/// 3. Require the result to be UTF-8
/// 4. Split on the first ':' into identity and secret
pub fn parse_credentials(headers: &HeaderMap) -> Result<(String, String), AuthError> {
    // Get Authorization header
    let header = headers
        .get("authorization")
        .ok_or(AuthError::Missing)?
        .to_str()
        .map_err(|_| AuthError::Invalid)?;

    // Decode base64 payload
    let decoded = BASE64.decode(header).map_err(|_| AuthError::Invalid)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Invalid)?;

    // Split on the first colon only; issued secrets are hex and never
    // contain one, so everything after the first colon is the secret
    let parts: Vec<&str> = decoded.splitn(2, ':').collect();
    if parts.len() != 2 {
        return Err(AuthError::Invalid);
    }

    let identity = parts[0];
    let secret = parts[1];

    // Reject empty fields
    if identity.is_empty() || secret.is_empty() {
        return Err(AuthError::Invalid);
    }

    Ok((identity.to_string(), secret.to_string()))
}

/// Run the full authentication gate for a settings request.
///
/// # Flow
/// 1. Parse credentials from the Authorization header
/// 2. Check the identity against the allow-list, if one is configured
/// 3. Verify the secret against the issued one
///
/// # Errors
/// - Missing: no Authorization header
/// - Invalid: bad encoding, unknown identity, or wrong secret
/// - NotAllowed: identity is not on the configured allow-list
/// - StoreFailed: the secret store could not be reached
pub async fn authenticate(
    headers: &HeaderMap,
    secrets: &SecretStore,
    allowed_users: Option<&HashSet<String>>,
) -> Result<AuthedUser, AuthError> {
    let (identity, secret) = parse_credentials(headers)?;

    // The allow-list applies before the secret is even looked at
    if let Some(allowed) = allowed_users {
        if !allowed.contains(&identity) {
            return Err(AuthError::NotAllowed);
        }
    }

    match secrets.verify(&identity, &secret).await {
        Ok(true) => Ok(AuthedUser { id: identity }),
        Ok(false) => Err(AuthError::Invalid),
        Err(e) => {
            error!(error = %e, "Secret verification hit a store failure");
            Err(AuthError::StoreFailed)
        }
    }
}
