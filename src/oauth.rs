use std::path::Path;

use tracing::{debug, info};
use url::Url;

use crate::server::{find_free_port, wait_for_code};
use crate::types::{
    AuthorizationSession, ClientSecrets, OAuthConfig, OAuthConfigBuilder, REDIRECT_PORT, TokenSet,
    generate_state_token,
};
use crate::{KeywordIdeasError, Result};

/// Blocking OAuth client for the Google authorization-code grant
///
/// # Example
///
/// ```no_run
/// use keyword_ideas::{OAuthClient, OAuthConfig};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = OAuthConfig::builder()
///         .client_id("client-id.apps.googleusercontent.com")
///         .client_secret("secret")
///         .redirect_port(8008)
///         .build();
///     let client = OAuthClient::new(config);
///     let session = client.start_flow()?;
///
///     println!("Visit: {}", session.authorization_url);
///     // Capture the redirect on port `session.port`...
///
///     let tokens = client.exchange_code("code")?;
///     println!("Refresh token: {:?}", tokens.refresh_token);
///     Ok(())
/// }
/// ```
pub struct OAuthClient {
    config: OAuthConfig,
    http: reqwest::blocking::Client,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::blocking::Client::new(),
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Start an authorization attempt
    ///
    /// Generates a fresh anti-forgery token and the consent URL. The URL asks
    /// for offline access with a forced consent prompt so that Google always
    /// returns a refresh token.
    pub fn start_flow(&self) -> Result<AuthorizationSession> {
        let state = generate_state_token();

        let redirect = Url::parse(&self.config.redirect_uri)?;
        let port = redirect.port_or_known_default().ok_or_else(|| {
            KeywordIdeasError::Validation(format!(
                "Redirect URI has no port: {}",
                self.config.redirect_uri
            ))
        })?;

        let mut url = Url::parse(&self.config.auth_url)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", self.config.client_id.as_str())
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", &state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("include_granted_scopes", "true");

        Ok(AuthorizationSession {
            authorization_url: url.to_string(),
            state,
            port,
        })
    }

    /// Exchange a (percent-decoded) authorization code for tokens
    pub fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        debug!("Exchanging authorization code for tokens");
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        self.token_request(&params)
    }

    /// Trade a refresh token for a new access token
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenSet> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        self.token_request(&params)
    }

    fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenSet> {
        let response = self
            .http
            .post(&self.config.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(params)
            .send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(KeywordIdeasError::Http { status, body });
        }

        Ok(response.json()?)
    }

    /// Run one interactive authorization and return the refresh token
    ///
    /// `notify` receives the session once the consent URL exists, before the
    /// listener starts blocking. The browser is opened on a best-effort basis.
    pub fn authorize<F>(&self, notify: F) -> Result<String>
    where
        F: FnOnce(&AuthorizationSession),
    {
        let session = self.start_flow()?;
        notify(&session);

        open_browser_best_effort(&session.authorization_url);

        let raw_code = wait_for_code(session.port, &session.state)?;
        let code = decode_code(&raw_code)?;
        info!("Authorization code received");

        let tokens = self.exchange_code(&code)?;
        tokens.refresh_token.ok_or_else(|| {
            KeywordIdeasError::Authorization(
                "Token response did not include a refresh token".to_string(),
            )
        })
    }
}

#[cfg(feature = "browser")]
fn open_browser_best_effort(url: &str) {
    if let Err(e) = crate::browser::open_browser(url) {
        tracing::warn!(error = %e, "Could not open browser; visit the URL manually");
    }
}

#[cfg(not(feature = "browser"))]
fn open_browser_best_effort(_url: &str) {}

fn decode_code(raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|code| code.into_owned())
        .map_err(|e| KeywordIdeasError::Authorization(format!("Invalid authorization code: {}", e)))
}

/// Obtain a refresh token for the Google Ads API
///
/// Reads the OAuth client secrets, picks a free loopback port starting at
/// 8008, and walks the user through consent. The AdWords scope is always
/// requested; `additional_scopes` are appended.
///
/// # Errors
///
/// Any failure (unreadable secrets, denied consent, state mismatch, token
/// endpoint error) is returned to the caller unchanged.
pub fn get_refresh_token<F>(
    secrets_path: impl AsRef<Path>,
    additional_scopes: &[String],
    notify: F,
) -> Result<String>
where
    F: FnOnce(&AuthorizationSession),
{
    let secrets = ClientSecrets::from_file(secrets_path)?;
    let port = find_free_port(REDIRECT_PORT)?;

    let mut builder = OAuthConfigBuilder::from(secrets).redirect_port(port);
    for scope in additional_scopes {
        builder = builder.scope(scope);
    }

    OAuthClient::new(builder.build()).authorize(notify)
}
