//! # keyword-ideas
//!
//! A blocking Rust client for the Google Ads keyword planner, together with the
//! loopback OAuth flow needed to obtain its refresh token.
//!
//! ## Features
//!
//! - **Refresh Token Flow**: One-shot loopback listener capturing the OAuth redirect
//! - **Keyword Ideas**: Seed by keywords, a page URL or both, with result paging
//! - **Geo Resolution**: Country names and codes resolved through the suggestion service
//! - **Output Shapes**: Raw, table, records, compact records or plain text
//! - **Exports**: Tables saved as CSV or HTML
//! - **Browser Integration**: Auto-open browser for consent (default)
//!
//! ## Quick Start (Refresh Token)
//!
//! ```no_run
//! use keyword_ideas::get_refresh_token;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let refresh_token = get_refresh_token("./google_oauth.json", &[], |session| {
//!         println!("Paste this URL into your browser: {}", session.authorization_url);
//!     })?;
//!     println!("Refresh token: {}", refresh_token);
//!     Ok(())
//! }
//! ```
//!
//! ## Quick Start (Keyword Ideas)
//!
//! ```no_run
//! use keyword_ideas::{CredentialsSource, KeywordIdeasQuery, OutputFormat, run_keyword_ideas};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let query = KeywordIdeasQuery::new("US,CA", "en", "dental implants")
//!         .output(OutputFormat::Table);
//!     let outcome = run_keyword_ideas(&CredentialsSource::default(), &query)?;
//!
//!     if let Some(table) = outcome.output.as_table() {
//!         println!("{}", table.shortly());
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod types;

pub mod ads;
pub mod config;
pub mod geo;
pub mod languages;
pub mod output;
pub mod request;
pub mod server;

mod oauth;
mod query;

#[cfg(feature = "browser")]
mod browser;

// Public API exports
pub use error::{FieldError, KeywordIdeasError, Result};
pub use types::{
    ADWORDS_SCOPE, AuthorizationSession, CLIENT_SECRETS_PATH, ClientSecrets, OAuthConfig,
    OAuthConfigBuilder, REDIRECT_HOST, REDIRECT_PORT, TokenSet,
};

pub use oauth::{OAuthClient, get_refresh_token};
pub use server::{CallbackEvent, capture_redirect, find_free_port, wait_for_code, wait_for_code_with_html};

pub use ads::{GoogleAdsClient, KeywordPlanService};
pub use config::{CREDENTIALS_PATH, CredentialsSource, StoredCredentials};
pub use geo::{GeoTargetQuery, GeoTargetScope, resolve_geo_targets};
pub use languages::language_id;
pub use output::{IdeasOutput, IdeasTable, OutputFormat, transform};
pub use query::{KeywordIdeasQuery, QueryOutcome, QueryReport, get_keyword_ideas, run_keyword_ideas};
pub use request::{KeywordIdeaRequest, KeywordSeed};

#[cfg(feature = "browser")]
pub use browser::open_browser;
