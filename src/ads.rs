//! Google Ads API boundary.
//!
//! [`KeywordPlanService`] is the seam the query flow talks to; [`GoogleAdsClient`]
//! implements it over the REST interface. Schema types mirror the REST JSON
//! field names (camelCase, int64 values encoded as strings).

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::StoredCredentials;
use crate::error::FieldError;
use crate::oauth::OAuthClient;
use crate::request::KeywordIdeaRequest;
use crate::types::OAuthConfig;
use crate::{KeywordIdeasError, Result};

/// Google Ads API version the REST client targets
pub const API_VERSION: &str = "v17";

const ADS_BASE_URL: &str = "https://googleads.googleapis.com";

/// Operations of the advertising API used by the query flow
pub trait KeywordPlanService {
    /// Look up geo target constants matching the given location names
    fn suggest_geo_target_constants(
        &self,
        request: &SuggestGeoTargetConstantsRequest,
    ) -> Result<SuggestGeoTargetConstantsResponse>;

    /// Generate keyword ideas for one seed; returns the complete result set
    fn generate_keyword_ideas(
        &self,
        request: &KeywordIdeaRequest,
    ) -> Result<GenerateKeywordIdeaResponse>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestGeoTargetConstantsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub location_names: LocationNames,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationNames {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestGeoTargetConstantsResponse {
    #[serde(default)]
    pub geo_target_constant_suggestions: Vec<GeoTargetConstantSuggestion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoTargetConstantSuggestion {
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default, deserialize_with = "int64::deserialize")]
    pub reach: Option<i64>,
    #[serde(default)]
    pub search_term: Option<String>,
    pub geo_target_constant: GeoTargetConstant,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoTargetConstant {
    pub resource_name: String,
    #[serde(default, deserialize_with = "int64::deserialize")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub target_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub canonical_name: String,
}

/// Full keyword-ideas result set, as returned by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateKeywordIdeaResponse {
    #[serde(default)]
    pub results: Vec<GenerateKeywordIdeaResult>,
    #[serde(default, deserialize_with = "int64::deserialize")]
    pub total_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl GenerateKeywordIdeaResponse {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateKeywordIdeaResult {
    pub text: String,
    #[serde(default)]
    pub keyword_idea_metrics: KeywordPlanHistoricalMetrics,
    #[serde(default)]
    pub keyword_annotations: KeywordAnnotations,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub close_variants: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordPlanHistoricalMetrics {
    #[serde(default, deserialize_with = "int64::deserialize")]
    pub avg_monthly_searches: Option<i64>,
    #[serde(default)]
    pub monthly_search_volumes: Vec<MonthlySearchVolume>,
    #[serde(default)]
    pub competition: CompetitionLevel,
    #[serde(default, deserialize_with = "int64::deserialize")]
    pub competition_index: Option<i64>,
    #[serde(default, deserialize_with = "int64::deserialize")]
    pub low_top_of_page_bid_micros: Option<i64>,
    #[serde(default, deserialize_with = "int64::deserialize")]
    pub high_top_of_page_bid_micros: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySearchVolume {
    #[serde(default, deserialize_with = "int64::deserialize")]
    pub year: Option<i64>,
    #[serde(default)]
    pub month: MonthOfYear,
    #[serde(default, deserialize_with = "int64::deserialize")]
    pub monthly_searches: Option<i64>,
}

impl MonthlySearchVolume {
    /// `YYYY-MM` label, empty when the provider left year or month unset
    pub fn label(&self) -> String {
        match (self.year, self.month.number()) {
            (Some(year), Some(month)) => format!("{}-{:02}", year, month),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordAnnotations {
    #[serde(default)]
    pub concepts: Vec<KeywordConcept>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordConcept {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub concept_group: ConceptGroup,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConceptGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub group_type: String,
}

/// Advertiser competition for a keyword
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompetitionLevel {
    #[default]
    Unspecified,
    Low,
    Medium,
    High,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for CompetitionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompetitionLevel::Unspecified => "UNSPECIFIED",
            CompetitionLevel::Unknown => "UNKNOWN",
            CompetitionLevel::Low => "LOW",
            CompetitionLevel::Medium => "MEDIUM",
            CompetitionLevel::High => "HIGH",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonthOfYear {
    #[default]
    Unspecified,
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
    #[serde(other)]
    Unknown,
}

impl MonthOfYear {
    /// Calendar month number, 1 for January
    pub fn number(self) -> Option<u32> {
        let n = match self {
            MonthOfYear::Unspecified | MonthOfYear::Unknown => return None,
            MonthOfYear::January => 1,
            MonthOfYear::February => 2,
            MonthOfYear::March => 3,
            MonthOfYear::April => 4,
            MonthOfYear::May => 5,
            MonthOfYear::June => 6,
            MonthOfYear::July => 7,
            MonthOfYear::August => 8,
            MonthOfYear::September => 9,
            MonthOfYear::October => 10,
            MonthOfYear::November => 11,
            MonthOfYear::December => 12,
        };
        Some(n)
    }
}

/// int64 fields arrive as JSON strings; accept plain numbers too
mod int64 {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Number(n)) => Ok(Some(n)),
            Some(Raw::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ApiErrorDetail>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorDetail {
    #[serde(default)]
    errors: Vec<AdsError>,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdsError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    location: Option<AdsErrorLocation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdsErrorLocation {
    #[serde(default)]
    field_path_elements: Vec<FieldPathElement>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldPathElement {
    field_name: String,
}

/// Turn a failed API response into a structured error
///
/// Bodies that are not a Google Ads failure envelope fall back to a plain
/// HTTP error.
pub(crate) fn parse_api_error(status: u16, request_id: Option<String>, body: &str) -> KeywordIdeasError {
    let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(body) else {
        return KeywordIdeasError::Http {
            status,
            body: body.to_string(),
        };
    };
    let error = envelope.error;

    let request_id = error
        .details
        .iter()
        .find_map(|detail| detail.request_id.clone())
        .or(request_id)
        .unwrap_or_default();

    let mut details: Vec<FieldError> = error
        .details
        .into_iter()
        .flat_map(|detail| detail.errors)
        .map(|e| FieldError {
            message: e.message,
            field_path: e
                .location
                .map(|loc| {
                    loc.field_path_elements
                        .into_iter()
                        .map(|el| el.field_name)
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();
    if details.is_empty() && !error.message.is_empty() {
        details.push(FieldError {
            message: error.message,
            field_path: Vec::new(),
        });
    }

    let code = if error.status.is_empty() {
        status.to_string()
    } else {
        error.status
    };

    KeywordIdeasError::ExternalService {
        request_id,
        code,
        details,
    }
}

/// Blocking REST client for the Google Ads API
///
/// Holds one access token obtained from the stored refresh token at
/// construction time; it is not refreshed afterwards.
pub struct GoogleAdsClient {
    http: reqwest::blocking::Client,
    credentials: StoredCredentials,
    base_url: String,
    access_token: String,
}

impl GoogleAdsClient {
    /// Create a client against the production endpoints
    ///
    /// # Errors
    ///
    /// Fails when the refresh token cannot be exchanged for an access token
    pub fn new(credentials: StoredCredentials) -> Result<Self> {
        Self::with_endpoints(credentials, ADS_BASE_URL, None)
    }

    /// Create a client with custom API and token endpoints
    pub fn with_endpoints(
        credentials: StoredCredentials,
        base_url: impl Into<String>,
        token_url: Option<String>,
    ) -> Result<Self> {
        let oauth = oauth_client(&credentials, token_url);
        let tokens = oauth.refresh_access_token(&credentials.refresh_token)?;
        info!("Obtained Google Ads access token");

        Ok(Self {
            http: reqwest::blocking::Client::new(),
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: tokens.access_token,
        })
    }

    /// Whether the stored refresh token is still accepted by the token endpoint
    ///
    /// A rejected token yields `Ok(false)`; transport failures are errors.
    pub fn credentials_valid(credentials: &StoredCredentials) -> Result<bool> {
        Self::credentials_valid_at(credentials, None)
    }

    /// [`GoogleAdsClient::credentials_valid`] against a custom token endpoint
    pub fn credentials_valid_at(
        credentials: &StoredCredentials,
        token_url: Option<String>,
    ) -> Result<bool> {
        let oauth = oauth_client(credentials, token_url);
        match oauth.refresh_access_token(&credentials.refresh_token) {
            Ok(_) => Ok(true),
            Err(KeywordIdeasError::Http { status, body }) => {
                debug!(status, %body, "Refresh token rejected");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn credentials(&self) -> &StoredCredentials {
        &self.credentials
    }

    /// Account used when a query does not name one
    pub fn login_customer_id(&self) -> Option<&str> {
        self.credentials.login_customer_id.as_deref()
    }

    fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}/{}", self.base_url, API_VERSION, path);
        debug!(%url, "Calling Google Ads API");

        let mut request = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("developer-token", &self.credentials.developer_token)
            .json(body);
        if let Some(id) = &self.credentials.login_customer_id {
            request = request.header("login-customer-id", id);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let request_id = response
                .headers()
                .get("request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().unwrap_or_default();
            return Err(parse_api_error(status, request_id, &body));
        }

        Ok(response.json()?)
    }
}

fn oauth_client(credentials: &StoredCredentials, token_url: Option<String>) -> OAuthClient {
    let mut builder = OAuthConfig::builder()
        .client_id(&credentials.client_id)
        .client_secret(&credentials.client_secret);
    if let Some(token_url) = token_url {
        builder = builder.token_url(token_url);
    }
    OAuthClient::new(builder.build())
}

impl KeywordPlanService for GoogleAdsClient {
    fn suggest_geo_target_constants(
        &self,
        request: &SuggestGeoTargetConstantsRequest,
    ) -> Result<SuggestGeoTargetConstantsResponse> {
        self.post("geoTargetConstants:suggest", request)
    }

    fn generate_keyword_ideas(
        &self,
        request: &KeywordIdeaRequest,
    ) -> Result<GenerateKeywordIdeaResponse> {
        let path = format!("customers/{}:generateKeywordIdeas", request.customer_id);
        let mut page_request = request.clone();
        let mut combined = GenerateKeywordIdeaResponse::default();

        loop {
            let page: GenerateKeywordIdeaResponse = self.post(&path, &page_request)?;
            if combined.total_size.is_none() {
                combined.total_size = page.total_size;
            }
            combined.results.extend(page.results);

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => {
                    debug!(fetched = combined.results.len(), "Fetching next keyword ideas page");
                    page_request.page_token = Some(token);
                }
                None => break,
            }
        }

        Ok(combined)
    }
}

/// In-memory [`KeywordPlanService`] that records every call
#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    pub(crate) struct FakePlanner {
        pub suggestions: Vec<GeoTargetConstant>,
        pub ideas: GenerateKeywordIdeaResponse,
        pub fail_ideas: Option<fn() -> KeywordIdeasError>,
        pub geo_requests: RefCell<Vec<SuggestGeoTargetConstantsRequest>>,
        pub idea_requests: RefCell<Vec<KeywordIdeaRequest>>,
    }

    impl FakePlanner {
        pub(crate) fn with_countries(codes: &[(&str, &str, &str)]) -> Self {
            let suggestions = codes
                .iter()
                .map(|(id, country_code, target_type)| GeoTargetConstant {
                    resource_name: format!("geoTargetConstants/{}", id),
                    country_code: country_code.to_string(),
                    target_type: target_type.to_string(),
                    ..Default::default()
                })
                .collect();
            Self {
                suggestions,
                ..Default::default()
            }
        }
    }

    /// Stub HTTP server for the blocking clients
    ///
    /// The runtime only drives the server; requests are made from the test thread.
    pub(crate) struct MockApi {
        pub server: wiremock::MockServer,
        runtime: tokio::runtime::Runtime,
    }

    impl MockApi {
        pub(crate) fn start() -> Self {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let server = runtime.block_on(wiremock::MockServer::start());
            Self { server, runtime }
        }

        pub(crate) fn mount(&self, mock: wiremock::Mock) {
            self.runtime.block_on(mock.mount(&self.server));
        }

        pub(crate) fn url(&self, path: &str) -> String {
            format!("{}{}", self.server.uri(), path)
        }
    }

    impl KeywordPlanService for FakePlanner {
        fn suggest_geo_target_constants(
            &self,
            request: &SuggestGeoTargetConstantsRequest,
        ) -> Result<SuggestGeoTargetConstantsResponse> {
            self.geo_requests.borrow_mut().push(request.clone());
            Ok(SuggestGeoTargetConstantsResponse {
                geo_target_constant_suggestions: self
                    .suggestions
                    .iter()
                    .map(|constant| GeoTargetConstantSuggestion {
                        geo_target_constant: constant.clone(),
                        ..Default::default()
                    })
                    .collect(),
            })
        }

        fn generate_keyword_ideas(
            &self,
            request: &KeywordIdeaRequest,
        ) -> Result<GenerateKeywordIdeaResponse> {
            self.idea_requests.borrow_mut().push(request.clone());
            match self.fail_ideas {
                Some(make_error) => Err(make_error()),
                None => Ok(self.ideas.clone()),
            }
        }
    }
}
