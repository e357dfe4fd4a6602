use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::Result;
use crate::ads::{KeywordPlanService, LocationNames, SuggestGeoTargetConstantsRequest};

/// Location used when no geo names resolve (United States)
pub const DEFAULT_LOCATION_IDS: &[&str] = &["2840"];

/// Which suggestions to keep when resolving geo names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GeoTargetScope {
    /// Keep every suggestion
    Any,
    /// Keep countries whose code matches one of the requested names
    #[default]
    Country,
    /// Keep suggestions of the given target type, e.g. `City` or `Region`
    TargetType(String),
}

impl FromStr for GeoTargetScope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let scope = match s.trim() {
            "" => GeoTargetScope::Any,
            s if s.eq_ignore_ascii_case("any") => GeoTargetScope::Any,
            s if s.eq_ignore_ascii_case("country") => GeoTargetScope::Country,
            s => GeoTargetScope::TargetType(s.to_string()),
        };
        Ok(scope)
    }
}

impl fmt::Display for GeoTargetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoTargetScope::Any => f.write_str("Any"),
            GeoTargetScope::Country => f.write_str("Country"),
            GeoTargetScope::TargetType(t) => f.write_str(t),
        }
    }
}

/// Geo names to look up through the suggestion service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoTargetQuery {
    /// Upper-cased, de-duplicated names
    pub names: Vec<String>,
    pub scope: GeoTargetScope,
    /// Locale for the returned names, e.g. `en` or `zh_CN`
    pub locale: Option<String>,
    /// Two-letter ISO code restricting suggestions to one country
    pub country_code: Option<String>,
}

impl GeoTargetQuery {
    /// Build a country-scoped query from comma-separated names such as `"US,CA"`
    pub fn new(names: &str) -> Self {
        Self::from_names(names.split(','))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim().to_uppercase();
            if !name.is_empty() && !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self {
            names: unique,
            ..Default::default()
        }
    }

    pub fn scope(mut self, scope: GeoTargetScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }
}

/// Resolve geo names to geo target constant resource names
///
/// With [`GeoTargetScope::Country`] a suggestion is kept only if its country
/// code equals one of the requested names; the provider also returns loosely
/// related places for a name. An empty name list resolves to nothing without
/// calling the service.
pub fn resolve_geo_targets<S>(service: &S, query: &GeoTargetQuery) -> Result<Vec<String>>
where
    S: KeywordPlanService + ?Sized,
{
    if query.names.is_empty() {
        return Ok(Vec::new());
    }

    let request = SuggestGeoTargetConstantsRequest {
        locale: query.locale.clone(),
        country_code: query.country_code.clone(),
        location_names: LocationNames {
            names: query.names.clone(),
        },
    };
    let response = service.suggest_geo_target_constants(&request)?;

    let mut resolved: Vec<String> = Vec::new();
    for suggestion in response.geo_target_constant_suggestions {
        let constant = suggestion.geo_target_constant;
        debug!(
            resource = %constant.resource_name,
            name = %constant.name,
            country_code = %constant.country_code,
            target_type = %constant.target_type,
            search_term = suggestion.search_term.as_deref().unwrap_or(""),
            "Geo target suggestion"
        );

        let keep = match &query.scope {
            GeoTargetScope::Any => true,
            GeoTargetScope::Country => {
                constant.target_type == "Country"
                    && query.names.contains(&constant.country_code.to_uppercase())
            }
            GeoTargetScope::TargetType(target_type) => &constant.target_type == target_type,
        };
        if keep && !resolved.contains(&constant.resource_name) {
            resolved.push(constant.resource_name);
        }
    }

    Ok(resolved)
}

/// Resource name for a geo target constant id, e.g. `geoTargetConstants/2840`
pub fn geo_target_constant_path(id: &str) -> String {
    format!("geoTargetConstants/{}", id.trim())
}

/// Map location ids straight to resource names, skipping empty entries
pub fn location_ids_to_resource_names<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = Vec::new();
    for id in ids {
        let id = id.as_ref().trim();
        if id.is_empty() {
            continue;
        }
        let path = geo_target_constant_path(id);
        if !names.contains(&path) {
            names.push(path);
        }
    }
    names
}
