use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::{KeywordIdeasError, Result};

/// Host the loopback redirect listener binds to
pub const REDIRECT_HOST: &str = "127.0.0.1";

/// Port probed first when looking for a free redirect port
pub const REDIRECT_PORT: u16 = 8008;

/// Scope every authorization request asks for
pub const ADWORDS_SCOPE: &str = "https://www.googleapis.com/auth/adwords";

/// Default location of the OAuth client secrets file
pub const CLIENT_SECRETS_PATH: &str = "./google_oauth.json";

const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth client secrets as downloaded from the Google Cloud console
///
/// The file wraps the actual fields in either an `installed` or a `web` object
/// depending on the client type.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

impl ClientSecrets {
    /// Parse a client secrets JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json).map_err(|e| {
            KeywordIdeasError::Configuration(format!("Invalid client secrets: {}", e))
        })?;
        file.installed.or(file.web).ok_or_else(|| {
            KeywordIdeasError::Configuration(
                "Client secrets must contain an \"installed\" or \"web\" section".to_string(),
            )
        })
    }

    /// Read and parse a client secrets file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            KeywordIdeasError::Configuration(format!(
                "Failed to read client secrets file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }
}

/// Configuration for the blocking OAuth client
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token exchange endpoint URL
    pub token_url: String,
    /// Redirect URI registered with the provider (default: "http://127.0.0.1:8008")
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Create a new config builder
    pub fn builder() -> OAuthConfigBuilder {
        OAuthConfigBuilder::default()
    }
}

/// Seed a builder with the endpoints and client from downloaded secrets
impl From<ClientSecrets> for OAuthConfigBuilder {
    fn from(secrets: ClientSecrets) -> Self {
        OAuthConfig::builder()
            .client_id(secrets.client_id)
            .client_secret(secrets.client_secret)
            .auth_url(secrets.auth_uri)
            .token_url(secrets.token_uri)
    }
}

/// Builder for OAuthConfig
#[derive(Debug, Clone, Default)]
pub struct OAuthConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_url: Option<String>,
    token_url: Option<String>,
    redirect_uri: Option<String>,
    scopes: Vec<String>,
}

impl OAuthConfigBuilder {
    /// Set the OAuth client ID
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the OAuth client secret
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Set the consent screen URL
    pub fn auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = Some(auth_url.into());
        self
    }

    /// Set the token endpoint URL
    pub fn token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    /// Set the redirect URI verbatim
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Point the redirect URI at the loopback listener on the given port
    pub fn redirect_port(mut self, port: u16) -> Self {
        self.redirect_uri = Some(format!("http://{}:{}", REDIRECT_HOST, port));
        self
    }

    /// Add a scope on top of the AdWords scope
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Build the config, filling unset fields with Google's defaults
    pub fn build(self) -> OAuthConfig {
        let mut scopes = vec![ADWORDS_SCOPE.to_string()];
        for scope in self.scopes {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        OAuthConfig {
            client_id: self.client_id.unwrap_or_default(),
            client_secret: self.client_secret.unwrap_or_default(),
            auth_url: self.auth_url.unwrap_or_else(default_auth_uri),
            token_url: self.token_url.unwrap_or_else(default_token_uri),
            redirect_uri: self
                .redirect_uri
                .unwrap_or_else(|| format!("http://{}:{}", REDIRECT_HOST, REDIRECT_PORT)),
            scopes,
        }
    }
}

/// State of one interactive authorization attempt
///
/// Lives only for the duration of a single flow and is never persisted.
#[derive(Debug, Clone)]
pub struct AuthorizationSession {
    /// The URL the user should visit to grant access
    pub authorization_url: String,
    /// Anti-forgery token echoed back through the redirect's `state` parameter
    pub state: String,
    /// Port the redirect listener must bind
    pub port: u16,
}

/// Tokens returned by the authorization server
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Generate a fresh anti-forgery token: hex SHA-256 of 1024 random bytes
pub(crate) fn generate_state_token() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; 1024];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(Sha256::digest(bytes))
}
