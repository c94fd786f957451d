//! OAuth provider configuration.
//!
//! Endpoint URLs and client credentials for the identity provider. The
//! defaults target Discord; every URL is configurable so a deployment
//! (or a test) can point at a different provider.

use serde::Deserialize;

/// OAuth provider configuration
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
    /// Authorization (consent screen) endpoint URL
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    /// Token exchange endpoint URL
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Identity endpoint URL, answering "whose token is this"
    #[serde(default = "default_identity_url")]
    pub identity_url: String,

    /// Requested OAuth scope
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Client ID
    #[serde(default)]
    pub client_id: String,

    /// Client secret
    #[serde(default)]
    pub client_secret: String,

    /// Redirect URI registered with the provider
    #[serde(default)]
    pub redirect_uri: String,
}

fn default_authorize_url() -> String {
    "https://discord.com/api/oauth2/authorize".to_string()
}

fn default_token_url() -> String {
    "https://discord.com/api/oauth2/token".to_string()
}

fn default_identity_url() -> String {
    "https://discord.com/api/users/@me".to_string()
}

fn default_scope() -> String {
    "identify".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            identity_url: default_identity_url(),
            scope: default_scope(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
        }
    }
}

impl ProviderConfig {
    /// Build the consent-screen URL.
    ///
    /// Deterministic: the same configuration always produces the same URL.
    /// No per-request state parameter is minted for it.
    pub fn build_authorize_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}",
            self.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.scope)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_authorize_url() {
        let config = ProviderConfig {
            authorize_url: "https://example.com/oauth/authorize".to_string(),
            client_id: "test_client_id".to_string(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
            scope: "identify".to_string(),
            ..ProviderConfig::default()
        };

        let url = config.build_authorize_url();

        assert!(url.starts_with("https://example.com/oauth/authorize?"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=identify"));
    }

    #[test]
    fn test_build_authorize_url_is_deterministic() {
        let config = ProviderConfig {
            client_id: "cid".to_string(),
            redirect_uri: "https://sync.example.com/callback".to_string(),
            ..ProviderConfig::default()
        };

        assert_eq!(config.build_authorize_url(), config.build_authorize_url());
    }

    #[test]
    fn test_defaults_target_discord() {
        let config = ProviderConfig::default();

        assert_eq!(config.authorize_url, "https://discord.com/api/oauth2/authorize");
        assert_eq!(config.token_url, "https://discord.com/api/oauth2/token");
        assert_eq!(config.identity_url, "https://discord.com/api/users/@me");
        assert_eq!(config.scope, "identify");
    }

    #[test]
    fn test_deserializes_with_partial_overrides() {
        // Only the credentials given; URLs fall back to the defaults
        let toml = r#"
            client_id = "cid"
            client_secret = "cs"
            redirect_uri = "https://sync.example.com/callback"
        "#;

        let config: ProviderConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.client_id, "cid");
        assert_eq!(config.token_url, "https://discord.com/api/oauth2/token");
    }
}
