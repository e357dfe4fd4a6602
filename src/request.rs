use std::collections::BTreeSet;

use serde::Serialize;

use crate::{KeywordIdeasError, Result};

/// Source the planner expands into keyword ideas
///
/// Exactly one seed is sent per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum KeywordSeed {
    #[serde(rename = "keywordSeed")]
    Keywords { keywords: Vec<String> },
    #[serde(rename = "urlSeed")]
    Url { url: String },
    #[serde(rename = "keywordAndUrlSeed")]
    KeywordsAndUrl { url: String, keywords: Vec<String> },
}

impl KeywordSeed {
    /// Pick the seed shape from whichever inputs are non-empty
    ///
    /// # Errors
    ///
    /// Returns a validation error when neither keywords nor a page URL are given
    pub fn from_inputs(keywords: &[String], page_url: Option<&str>) -> Result<Self> {
        let page_url = page_url.map(str::trim).filter(|url| !url.is_empty());
        match (keywords.is_empty(), page_url) {
            (false, Some(url)) => Ok(KeywordSeed::KeywordsAndUrl {
                url: url.to_string(),
                keywords: keywords.to_vec(),
            }),
            (false, None) => Ok(KeywordSeed::Keywords {
                keywords: keywords.to_vec(),
            }),
            (true, Some(url)) => Ok(KeywordSeed::Url {
                url: url.to_string(),
            }),
            (true, None) => Err(KeywordIdeasError::Validation(
                "At least one of keywords or page URL is required, but neither was specified"
                    .to_string(),
            )),
        }
    }

    pub fn keywords(&self) -> &[String] {
        match self {
            KeywordSeed::Keywords { keywords } | KeywordSeed::KeywordsAndUrl { keywords, .. } => {
                keywords
            }
            KeywordSeed::Url { .. } => &[],
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            KeywordSeed::Url { url } | KeywordSeed::KeywordsAndUrl { url, .. } => Some(url),
            KeywordSeed::Keywords { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeywordPlanNetwork {
    GoogleSearch,
    #[default]
    GoogleSearchAndPartners,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeywordAnnotation {
    KeywordConcept,
}

/// A single `generateKeywordIdeas` call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordIdeaRequest {
    /// Account the request runs under; part of the URL, not the body
    #[serde(skip)]
    pub customer_id: String,
    /// Language constant resource name; `None` means no language filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub geo_target_constants: Vec<String>,
    pub include_adult_keywords: bool,
    pub keyword_plan_network: KeywordPlanNetwork,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keyword_annotation: Vec<KeywordAnnotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    #[serde(flatten)]
    pub seed: KeywordSeed,
}

impl KeywordIdeaRequest {
    pub fn new(customer_id: impl Into<String>, seed: KeywordSeed) -> Self {
        Self {
            customer_id: customer_id.into(),
            language: None,
            geo_target_constants: Vec::new(),
            include_adult_keywords: false,
            keyword_plan_network: KeywordPlanNetwork::default(),
            keyword_annotation: Vec::new(),
            page_token: None,
            seed,
        }
    }

    pub fn language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn geo_target_constants(mut self, geos: Vec<String>) -> Self {
        self.geo_target_constants = geos;
        self
    }

    pub fn include_adult_keywords(mut self, include: bool) -> Self {
        self.include_adult_keywords = include;
        self
    }

    pub fn network(mut self, network: KeywordPlanNetwork) -> Self {
        self.keyword_plan_network = network;
        self
    }

    /// Ask the planner to annotate ideas with keyword concepts
    pub fn with_annotations(mut self, annotate: bool) -> Self {
        self.keyword_annotation = if annotate {
            vec![KeywordAnnotation::KeywordConcept]
        } else {
            Vec::new()
        };
        self
    }
}

/// Split a comma-separated keyword string into a trimmed, de-duplicated list
pub fn normalize_keywords(input: &str) -> Vec<String> {
    normalize_keyword_list(input.split(','))
}

/// Trim and de-duplicate keywords, dropping empty entries
pub fn normalize_keyword_list<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|kw| kw.as_ref().trim().to_string())
        .filter(|kw| !kw.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kws(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalizes_delimited_keywords() {
        let set: BTreeSet<_> = normalize_keywords("a, b ,a").into_iter().collect();
        assert_eq!(set, BTreeSet::from(["a".to_string(), "b".to_string()]));
        assert!(normalize_keywords(" , ,").is_empty());
    }

    #[test]
    fn keywords_only_seed() {
        let seed = KeywordSeed::from_inputs(&kws(&["dental implants"]), None).unwrap();
        assert_eq!(
            seed,
            KeywordSeed::Keywords {
                keywords: kws(&["dental implants"])
            }
        );
        assert_eq!(seed.url(), None);
    }

    #[test]
    fn url_only_seed() {
        let seed = KeywordSeed::from_inputs(&[], Some("https://example.com")).unwrap();
        assert_eq!(
            seed,
            KeywordSeed::Url {
                url: "https://example.com".to_string()
            }
        );
        assert!(seed.keywords().is_empty());
    }

    #[test]
    fn combined_seed() {
        let seed = KeywordSeed::from_inputs(&kws(&["a", "b"]), Some("https://example.com")).unwrap();
        assert_eq!(seed.keywords(), kws(&["a", "b"]).as_slice());
        assert_eq!(seed.url(), Some("https://example.com"));
        assert!(matches!(seed, KeywordSeed::KeywordsAndUrl { .. }));
    }

    #[test]
    fn missing_seed_inputs_fail_validation() {
        for url in [None, Some(""), Some("  ")] {
            let err = KeywordSeed::from_inputs(&[], url).unwrap_err();
            assert!(matches!(err, KeywordIdeasError::Validation(_)));
        }
    }

    #[test]
    fn request_body_carries_exactly_one_seed() {
        let seed = KeywordSeed::from_inputs(&kws(&["zahnimplantate"]), None).unwrap();
        let request = KeywordIdeaRequest::new("1234567890", seed)
            .language(Some("languageConstants/1001".to_string()))
            .geo_target_constants(vec!["geoTargetConstants/2276".to_string()])
            .with_annotations(true);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "language": "languageConstants/1001",
                "geoTargetConstants": ["geoTargetConstants/2276"],
                "includeAdultKeywords": false,
                "keywordPlanNetwork": "GOOGLE_SEARCH_AND_PARTNERS",
                "keywordAnnotation": ["KEYWORD_CONCEPT"],
                "keywordSeed": {"keywords": ["zahnimplantate"]}
            })
        );
    }

    #[test]
    fn url_seed_body_without_language() {
        let seed = KeywordSeed::from_inputs(&[], Some("https://example.com")).unwrap();
        let request = KeywordIdeaRequest::new("1", seed).include_adult_keywords(true);
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["urlSeed"], json!({"url": "https://example.com"}));
        assert_eq!(body["includeAdultKeywords"], json!(true));
        assert!(body.get("language").is_none());
        assert!(body.get("keywordSeed").is_none());
    }
}
