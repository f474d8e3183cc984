use crate::models::domain::{FacetParseError, Facets, GenderFilter};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Request to replace the facet selection
///
/// `gender` is `"any"` or a gender; `startsWith` is `"any"`, empty, or a single
/// letter. `maxLength` of 0 means unbounded.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FiltersRequest {
    #[serde(default)]
    #[validate(length(max = 32))]
    pub languages: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub styles: Vec<String>,
    #[serde(default, alias = "set_ids", rename = "setIds")]
    #[validate(length(max = 512))]
    pub set_ids: Vec<String>,
    #[serde(default = "default_any")]
    #[validate(custom(function = "validate_gender"))]
    pub gender: String,
    #[serde(default = "default_any", alias = "starts_with", rename = "startsWith")]
    #[validate(custom(function = "validate_starts_with"))]
    pub starts_with: String,
    #[serde(default, alias = "max_length", rename = "maxLength")]
    #[validate(range(max = 64))]
    pub max_length: usize,
}

fn default_any() -> String {
    "any".to_string()
}

fn validate_gender(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<GenderFilter>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("gender"))
}

fn parse_starts_with(value: &str) -> Result<Option<char>, FacetParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("any") {
        return Ok(None);
    }

    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if letter.is_alphabetic() => Ok(letter.to_lowercase().next()),
        _ => Err(FacetParseError {
            facet: "startsWith",
            value: value.to_string(),
        }),
    }
}

fn validate_starts_with(value: &str) -> Result<(), ValidationError> {
    parse_starts_with(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("starts_with"))
}

impl FiltersRequest {
    /// Convert to the session's facet model
    pub fn into_facets(self) -> Result<Facets, FacetParseError> {
        Ok(Facets {
            gender: self.gender.parse()?,
            starts_with: parse_starts_with(&self.starts_with)?,
            languages: self.languages,
            styles: self.styles,
            set_ids: self.set_ids,
            max_length: self.max_length,
        })
    }
}

/// Query for the stack endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StackQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 500))]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

impl Default for StackQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}
