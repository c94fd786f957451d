//! OAuth code-for-identity exchange.
//!
//! Two sequential hops against the provider: authorization code to access
//! token, then access token to stable user id. Neither hop is retried; an
//! authorization code is single-use, so a replay could never succeed.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::provider::ProviderConfig;

/// Token endpoint response (standard OAuth 2.0, extra fields ignored)
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
}

/// Identity endpoint response
#[derive(Deserialize, Debug)]
struct UserResponse {
    id: String,
}

/// Exchange failures, mapped onto HTTP statuses by the callback route
#[derive(Debug)]
pub enum ExchangeError {
    /// The provider answered the token request with a non-success status:
    /// the code is bad, expired, or already used
    InvalidCode,
    /// The token endpoint could not be reached, or its response could not
    /// be parsed
    TokenRequestFailed(String),
    /// The token was accepted but the identity lookup failed
    IdentityFetchFailed(String),
}

impl std::fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeError::InvalidCode => write!(f, "authorization code rejected"),
            ExchangeError::TokenRequestFailed(msg) => write!(f, "token request failed: {}", msg),
            ExchangeError::IdentityFetchFailed(msg) => write!(f, "identity fetch failed: {}", msg),
        }
    }
}

impl std::error::Error for ExchangeError {}

/// Resolve an authorization code to the provider's stable user id.
///
/// # Flow
/// 1. POST the code to the token endpoint (form-encoded, per OAuth 2.0)
/// 2. GET the identity endpoint with the returned bearer token
///
/// The access token lives only inside this call; it is never stored.
pub async fn exchange_code(provider: &ProviderConfig, code: &str) -> Result<String, ExchangeError> {
    let client = reqwest::Client::new();

    // Build form data for the token exchange
    let mut form_data = HashMap::new();
    form_data.insert("grant_type", "authorization_code");
    form_data.insert("code", code);
    form_data.insert("redirect_uri", provider.redirect_uri.as_str());
    form_data.insert("client_id", provider.client_id.as_str());
    form_data.insert("client_secret", provider.client_secret.as_str());

    debug!(token_url = %provider.token_url, "Exchanging authorization code");

    let response = client
        .post(&provider.token_url)
        .header("Accept", "application/json")
        .form(&form_data)
        .send()
        .await
        .map_err(|e| ExchangeError::TokenRequestFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ExchangeError::InvalidCode);
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ExchangeError::TokenRequestFailed(e.to_string()))?;

    debug!(identity_url = %provider.identity_url, "Fetching identity for exchanged token");

    let response = client
        .get(&provider.identity_url)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(|e| ExchangeError::IdentityFetchFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ExchangeError::IdentityFetchFailed(format!(
            "identity endpoint answered {}",
            response.status()
        )));
    }

    let user: UserResponse = response
        .json()
        .await
        .map_err(|e| ExchangeError::IdentityFetchFailed(e.to_string()))?;

    // A blank id would collapse every such user onto one store key
    if user.id.is_empty() {
        return Err(ExchangeError::IdentityFetchFailed(
            "identity endpoint returned an empty id".to_string(),
        ));
    }

    Ok(user.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_deserialization() {
        // Providers send more fields than we use; they must not break parsing
        let json = r#"{
            "access_token": "atk_1234567890",
            "token_type": "Bearer",
            "expires_in": 604800,
            "refresh_token": "rtk_0987654321",
            "scope": "identify"
        }"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "atk_1234567890");
    }

    #[test]
    fn test_token_response_requires_access_token() {
        let json = r#"{"token_type": "Bearer"}"#;
        assert!(serde_json::from_str::<TokenResponse>(json).is_err());
    }

    #[test]
    fn test_user_response_deserialization() {
        // Shaped like a Discord /users/@me answer
        let json = r#"{
            "id": "80351110224678912",
            "username": "nelly",
            "discriminator": "1337",
            "avatar": "8342729096ea3675442027381ff50dfe"
        }"#;

        let response: UserResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id, "80351110224678912");
    }
}
