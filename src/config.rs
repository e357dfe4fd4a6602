//! Stored Google Ads credentials.
//!
//! The credential file is owned by the user: this crate only reads it. The
//! refresh-token flow prints a token for the user to paste in manually.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{KeywordIdeasError, Result};

/// Default location of the credential file
pub const CREDENTIALS_PATH: &str = "./google-ads.toml";

/// Prefix of the environment variables that override credential fields
pub const ENV_PREFIX: &str = "GOOGLE_ADS_";

/// Developer token, OAuth client and refresh token for the Ads API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub developer_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Manager or default account, digits only
    #[serde(default, deserialize_with = "customer_id::deserialize")]
    pub login_customer_id: Option<String>,
}

/// Account ids come back as integers from unquoted TOML and from the environment
mod customer_id {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
            Raw::Text(s) => s,
            Raw::Unsigned(n) => n.to_string(),
            Raw::Signed(n) => n.to_string(),
        }))
    }
}

/// Where to load credentials from
#[derive(Debug, Clone)]
pub enum CredentialsSource {
    /// TOML file, with `GOOGLE_ADS_*` environment overrides
    File(PathBuf),
    /// `GOOGLE_ADS_*` environment variables only
    Env,
    /// An inline TOML document
    Toml(String),
    /// Credentials already in memory
    Inline(StoredCredentials),
}

impl Default for CredentialsSource {
    fn default() -> Self {
        CredentialsSource::File(PathBuf::from(CREDENTIALS_PATH))
    }
}

impl CredentialsSource {
    /// Resolve the source into validated credentials
    pub fn load(&self) -> Result<StoredCredentials> {
        let credentials = match self {
            CredentialsSource::File(path) => load_from_path(path)?,
            CredentialsSource::Env => extract(Figment::new().merge(Env::prefixed(ENV_PREFIX)))?,
            CredentialsSource::Toml(document) => {
                extract(Figment::new().merge(Toml::string(document)))?
            }
            CredentialsSource::Inline(credentials) => credentials.clone(),
        };
        credentials.validated()
    }
}

/// Load credentials from a TOML file with environment overrides
pub fn load_from_path(path: &Path) -> Result<StoredCredentials> {
    if !path.is_file() {
        return Err(KeywordIdeasError::Configuration(format!(
            "Credential file not found: {}",
            path.display()
        )));
    }
    extract(
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX)),
    )
}

fn extract(figment: Figment) -> Result<StoredCredentials> {
    figment
        .extract()
        .map_err(|e| KeywordIdeasError::Configuration(e.to_string()))
}

impl StoredCredentials {
    fn validated(mut self) -> Result<Self> {
        self.login_customer_id = match self.login_customer_id.as_deref() {
            None | Some("") => None,
            Some(id) => Some(normalize_customer_id(id)?),
        };
        Ok(self)
    }
}

/// Strip the dashes from an `XXX-XXX-XXXX` account id
pub fn normalize_customer_id(id: &str) -> Result<String> {
    let digits: String = id.trim().chars().filter(|c| *c != '-').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(KeywordIdeasError::Validation(format!(
            "Invalid customer ID '{}': expected XXXXXXXXXX or XXX-XXX-XXXX",
            id
        )));
    }
    Ok(digits)
}
