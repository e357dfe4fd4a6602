use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::ads::{GoogleAdsClient, KeywordPlanService};
use crate::config::{CredentialsSource, normalize_customer_id};
use crate::geo::{DEFAULT_LOCATION_IDS, GeoTargetQuery, location_ids_to_resource_names, resolve_geo_targets};
use crate::languages::{DEFAULT_LANGUAGE_ID, language_constant_path, language_id};
use crate::output::{IdeasOutput, OutputFormat, transform};
use crate::request::{KeywordIdeaRequest, KeywordSeed, normalize_keyword_list, normalize_keywords};
use crate::{KeywordIdeasError, Result};

/// Inputs of one keyword planner query
#[derive(Debug, Clone, Default)]
pub struct KeywordIdeasQuery {
    pub geo: GeoTargetQuery,
    /// Language code, English name or numeric id
    pub language: String,
    pub keywords: Vec<String>,
    pub page_url: Option<String>,
    /// Overrides the account from the stored credentials
    pub customer_id: Option<String>,
    pub output: OutputFormat,
    pub include_adult: bool,
    pub with_annotations: bool,
    /// Leave geo targeting out instead of falling back to the default location
    pub with_null_geos: bool,
    /// Leave the language filter out instead of falling back to English
    pub with_null_lang: bool,
    pub csv_file: Option<PathBuf>,
    pub html_file: Option<PathBuf>,
}

impl KeywordIdeasQuery {
    /// Query from comma-separated geo names and keywords, e.g. `("US,CA", "en", "dental implants")`
    pub fn new(geos: &str, language: &str, keywords: &str) -> Self {
        Self {
            geo: GeoTargetQuery::new(geos),
            language: language.to_string(),
            keywords: normalize_keywords(keywords),
            ..Default::default()
        }
    }

    pub fn keyword_list<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords = normalize_keyword_list(keywords);
        self
    }

    pub fn page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn customer_id(mut self, id: impl Into<String>) -> Self {
        self.customer_id = Some(id.into());
        self
    }

    pub fn output(mut self, format: OutputFormat) -> Self {
        self.output = format;
        self
    }

    pub fn csv_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_file = Some(path.into());
        self
    }

    pub fn html_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.html_file = Some(path.into());
        self
    }
}

/// Parameters actually used for a query, with timing
#[derive(Debug, Clone)]
pub struct QueryReport {
    pub customer_id: String,
    pub geos: Vec<String>,
    pub language: Option<u32>,
    pub keywords: Vec<String>,
    pub page_url: Option<String>,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl QueryReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished - self.started
    }
}

impl fmt::Display for QueryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let language = self
            .language
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        let elapsed = self.elapsed();
        writeln!(f, " - started: {}", self.started)?;
        writeln!(f, " - customer_id: {}", self.customer_id)?;
        writeln!(f, " - geos: {}", self.geos.join(", "))?;
        writeln!(f, " - lang: {}", language)?;
        writeln!(f, " - keywords: {}", self.keywords.join(", "))?;
        writeln!(f, " - page_url: {}", self.page_url.as_deref().unwrap_or("none"))?;
        writeln!(f, " - finished: {}", self.finished)?;
        writeln!(
            f,
            " - elapsed: {}.{:03}s",
            elapsed.num_seconds(),
            elapsed.num_milliseconds().rem_euclid(1000)
        )
    }
}

/// Result of a query together with what was sent
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub output: IdeasOutput,
    pub report: QueryReport,
}

/// Run a keyword planner query against any [`KeywordPlanService`]
///
/// Geo names that resolve to nothing fall back to the default location and an
/// unknown language falls back to English, unless the query opts out. Files
/// are only written for [`OutputFormat::Table`].
///
/// # Errors
///
/// Fails with a validation error when no account is known or neither keywords
/// nor a page URL are given. Service errors are returned unchanged.
pub fn get_keyword_ideas<S>(
    service: &S,
    default_customer_id: Option<&str>,
    query: &KeywordIdeasQuery,
) -> Result<QueryOutcome>
where
    S: KeywordPlanService + ?Sized,
{
    let started = Utc::now();

    let customer_id = query
        .customer_id
        .as_deref()
        .or(default_customer_id)
        .ok_or_else(|| {
            KeywordIdeasError::Validation(
                "No customer ID given and none set in the credentials".to_string(),
            )
        })
        .and_then(normalize_customer_id)?;
    let seed = KeywordSeed::from_inputs(&query.keywords, query.page_url.as_deref())?;

    let mut geos = resolve_geo_targets(service, &query.geo)?;
    if geos.is_empty() && !query.with_null_geos {
        debug!("No geo names resolved, using default locations");
        geos = location_ids_to_resource_names(DEFAULT_LOCATION_IDS.iter());
    }

    let language = language_id(&query.language)
        .or((!query.with_null_lang).then_some(DEFAULT_LANGUAGE_ID));

    let request = KeywordIdeaRequest::new(&customer_id, seed)
        .language(language.map(language_constant_path))
        .geo_target_constants(geos.clone())
        .include_adult_keywords(query.include_adult)
        .with_annotations(query.with_annotations);

    info!(
        customer_id = %customer_id,
        geos = geos.len(),
        language = ?language,
        "Requesting keyword ideas"
    );
    let response = service.generate_keyword_ideas(&request)?;
    info!(results = response.results.len(), "Received keyword ideas");

    let output = transform(&response, query.output);
    if let IdeasOutput::Table(table) = &output {
        if let Some(path) = &query.csv_file {
            table.write_csv(path)?;
            info!(path = %path.display(), "Saved CSV");
        }
        if let Some(path) = &query.html_file {
            table.write_html(path)?;
            info!(path = %path.display(), "Saved HTML");
        }
    }

    Ok(QueryOutcome {
        output,
        report: QueryReport {
            customer_id,
            geos,
            language,
            keywords: request.seed.keywords().to_vec(),
            page_url: request.seed.url().map(str::to_string),
            started,
            finished: Utc::now(),
        },
    })
}

/// Load credentials, connect to Google Ads and run the query
pub fn run_keyword_ideas(source: &CredentialsSource, query: &KeywordIdeasQuery) -> Result<QueryOutcome> {
    let credentials = source.load()?;
    let client = GoogleAdsClient::new(credentials)?;
    get_keyword_ideas(&client, client.login_customer_id(), query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::fake::FakePlanner;
    use crate::ads::{GenerateKeywordIdeaResponse, GenerateKeywordIdeaResult};
    use crate::error::FieldError;

    fn planner_with_ideas() -> FakePlanner {
        let mut planner = FakePlanner::with_countries(&[
            ("2840", "US", "Country"),
            ("2124", "CA", "Country"),
            ("2484", "MX", "Country"),
        ]);
        planner.ideas = GenerateKeywordIdeaResponse {
            results: vec![
                GenerateKeywordIdeaResult {
                    text: "dental implants".to_string(),
                    ..Default::default()
                },
                GenerateKeywordIdeaResult {
                    text: "free dentist".to_string(),
                    ..Default::default()
                },
            ],
            total_size: Some(2),
            next_page_token: None,
        };
        planner
    }

    #[test]
    fn builds_request_from_resolved_inputs() {
        let planner = planner_with_ideas();
        let query = KeywordIdeasQuery::new("US,CA", "zh_CN", "dental implants, free dentist")
            .output(OutputFormat::Compact);

        let outcome = get_keyword_ideas(&planner, Some("123-456-7890"), &query).unwrap();

        let requests = planner.idea_requests.borrow();
        let request = &requests[0];
        assert_eq!(request.customer_id, "1234567890");
        assert_eq!(request.language.as_deref(), Some("languageConstants/1017"));
        assert_eq!(
            request.geo_target_constants,
            vec!["geoTargetConstants/2840", "geoTargetConstants/2124"]
        );
        assert!(matches!(request.seed, KeywordSeed::Keywords { .. }));

        assert_eq!(outcome.report.language, Some(1017));
        assert_eq!(outcome.report.keywords, vec!["dental implants", "free dentist"]);
        assert!(matches!(outcome.output, IdeasOutput::Compact(Some(ref r)) if r.len() == 2));
    }

    #[test]
    fn unknown_language_uses_default_unless_opted_out() {
        let planner = planner_with_ideas();
        let query = KeywordIdeasQuery::new("US", "xx", "implants");
        let outcome = get_keyword_ideas(&planner, Some("1"), &query).unwrap();
        assert_eq!(outcome.report.language, Some(DEFAULT_LANGUAGE_ID));

        let query = KeywordIdeasQuery {
            with_null_lang: true,
            ..query
        };
        let outcome = get_keyword_ideas(&planner, Some("1"), &query).unwrap();
        assert_eq!(outcome.report.language, None);
        assert_eq!(planner.idea_requests.borrow()[1].language, None);
    }

    #[test]
    fn unresolved_geos_fall_back_to_default_location() {
        let planner = planner_with_ideas();
        let query = KeywordIdeasQuery::new("ZZ", "en", "implants");
        let outcome = get_keyword_ideas(&planner, Some("1"), &query).unwrap();
        assert_eq!(outcome.report.geos, vec!["geoTargetConstants/2840"]);

        let query = KeywordIdeasQuery {
            with_null_geos: true,
            ..query
        };
        let outcome = get_keyword_ideas(&planner, Some("1"), &query).unwrap();
        assert!(outcome.report.geos.is_empty());
    }

    #[test]
    fn query_customer_id_overrides_credentials() {
        let planner = planner_with_ideas();
        let query = KeywordIdeasQuery::new("US", "en", "implants").customer_id("999-000-1111");
        let outcome = get_keyword_ideas(&planner, Some("1"), &query).unwrap();
        assert_eq!(outcome.report.customer_id, "9990001111");
    }

    #[test]
    fn missing_customer_id_is_validation_error() {
        let planner = planner_with_ideas();
        let query = KeywordIdeasQuery::new("US", "en", "implants");
        let err = get_keyword_ideas(&planner, None, &query).unwrap_err();
        assert!(matches!(err, KeywordIdeasError::Validation(_)));
    }

    #[test]
    fn missing_seed_fails_before_any_call() {
        let planner = planner_with_ideas();
        let query = KeywordIdeasQuery::new("US", "en", " , ");
        let err = get_keyword_ideas(&planner, Some("1"), &query).unwrap_err();
        assert!(matches!(err, KeywordIdeasError::Validation(_)));
        assert!(planner.geo_requests.borrow().is_empty());
        assert!(planner.idea_requests.borrow().is_empty());
    }

    #[test]
    fn url_only_query_sends_url_seed() {
        let planner = planner_with_ideas();
        let query = KeywordIdeasQuery::new("US", "en", "").page_url("https://example.com/implants");
        let outcome = get_keyword_ideas(&planner, Some("1"), &query).unwrap();
        assert!(matches!(
            planner.idea_requests.borrow()[0].seed,
            KeywordSeed::Url { .. }
        ));
        assert!(outcome.report.keywords.is_empty());
        assert_eq!(outcome.report.page_url.as_deref(), Some("https://example.com/implants"));
    }

    #[test]
    fn service_errors_propagate_unchanged() {
        let mut planner = planner_with_ideas();
        planner.fail_ideas = Some(|| KeywordIdeasError::ExternalService {
            request_id: "r-1".to_string(),
            code: "PERMISSION_DENIED".to_string(),
            details: vec![FieldError {
                message: "User doesn't have permission to access customer.".to_string(),
                field_path: Vec::new(),
            }],
        });
        let query = KeywordIdeasQuery::new("US", "en", "implants");
        match get_keyword_ideas(&planner, Some("1"), &query).unwrap_err() {
            KeywordIdeasError::ExternalService { request_id, code, .. } => {
                assert_eq!(request_id, "r-1");
                assert_eq!(code, "PERMISSION_DENIED");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn table_output_is_saved_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("last_results.csv");
        let html = dir.path().join("last_results.html");
        let planner = planner_with_ideas();
        let query = KeywordIdeasQuery::new("US", "en", "implants")
            .output(OutputFormat::Table)
            .csv_file(&csv)
            .html_file(&html);

        let outcome = get_keyword_ideas(&planner, Some("1"), &query).unwrap();
        assert_eq!(outcome.output.as_table().map(|t| t.len()), Some(2));
        assert_eq!(std::fs::read_to_string(&csv).unwrap().lines().count(), 3);
        assert!(std::fs::read_to_string(&html).unwrap().contains("free dentist"));
    }

    #[test]
    fn empty_results_are_reported_as_empty() {
        let mut planner = planner_with_ideas();
        planner.ideas = GenerateKeywordIdeaResponse::default();
        let query = KeywordIdeasQuery::new("US", "en", "implants").output(OutputFormat::Records);
        let outcome = get_keyword_ideas(&planner, Some("1"), &query).unwrap();
        assert!(matches!(outcome.output, IdeasOutput::Records(None)));
    }

    #[test]
    fn report_lists_parameters() {
        let planner = planner_with_ideas();
        let query = KeywordIdeasQuery::new("US", "de", "zahnimplantate");
        let report = get_keyword_ideas(&planner, Some("1"), &query).unwrap().report;
        let text = report.to_string();
        assert!(text.contains(" - lang: 1001"));
        assert!(text.contains(" - keywords: zahnimplantate"));
        assert!(report.elapsed() >= chrono::Duration::zero());
    }
}
