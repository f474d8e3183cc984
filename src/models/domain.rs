use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Grammatical gender a name is suggested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a facet value cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {facet} value: {value:?}")]
pub struct FacetParseError {
    pub facet: &'static str,
    pub value: String,
}

impl FromStr for Gender {
    type Err = FacetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "neutral" => Ok(Gender::Neutral),
            _ => Err(FacetParseError {
                facet: "gender",
                value: s.to_string(),
            }),
        }
    }
}

/// Gender facet: either no constraint or a single gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GenderFilter {
    #[default]
    Any,
    Only(Gender),
}

impl GenderFilter {
    #[inline]
    pub fn accepts(&self, gender: Gender) -> bool {
        match self {
            GenderFilter::Any => true,
            GenderFilter::Only(wanted) => *wanted == gender,
        }
    }
}

impl FromStr for GenderFilter {
    type Err = FacetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("any") {
            return Ok(GenderFilter::Any);
        }
        s.parse().map(GenderFilter::Only)
    }
}

impl TryFrom<String> for GenderFilter {
    type Error = FacetParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GenderFilter> for String {
    fn from(value: GenderFilter) -> Self {
        match value {
            GenderFilter::Any => "any".to_string(),
            GenderFilter::Only(gender) => gender.to_string(),
        }
    }
}

/// Immutable catalog record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    pub name: String,
    pub gender: Gender,
    #[serde(rename = "setId")]
    pub set_id: String,
    #[serde(rename = "setTitle")]
    pub set_title: String,
    pub language: String,
    pub style: String,
}

impl NameEntry {
    /// Lowercase form of the name, used for dedup and exclusion
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Metadata of a bundled name set (facet bucket)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSet {
    pub id: String,
    pub title: String,
    pub language: String,
    pub style: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Bundled offline dataset, as shipped with the app
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundledNamesData {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub last_updated: Option<String>,
    pub name_sets: Vec<BundledNameSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundledNameSet {
    #[serde(alias = "setId")]
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub language: String,
    pub style: String,
    #[serde(default)]
    pub names: Vec<BundledName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundledName {
    pub name: String,
    pub gender: String,
}

/// Filter criteria applied to the catalog
///
/// Set ids and excluded names are kept lowercase so the engine can compare
/// without allocating per candidate set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub enabled_set_ids: HashSet<String>,
    pub gender: GenderFilter,
    pub starts_with: Option<char>,
    pub max_length: usize,
    pub exclude_names: HashSet<String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sets<I, S>(mut self, set_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.enabled_set_ids = set_ids
            .into_iter()
            .map(|id| id.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn with_gender(mut self, gender: GenderFilter) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_starts_with(mut self, letter: Option<char>) -> Self {
        self.starts_with = letter.map(|c| c.to_lowercase().next().unwrap_or(c));
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn excluding<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_names = names
            .into_iter()
            .map(|n| n.as_ref().to_lowercase())
            .collect();
        self
    }
}

/// A user's facet selection, before exclusion history is applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default, alias = "set_ids")]
    pub set_ids: Vec<String>,
    #[serde(default)]
    pub gender: GenderFilter,
    #[serde(default, alias = "starts_with")]
    pub starts_with: Option<char>,
    #[serde(default, alias = "max_length")]
    pub max_length: usize,
}

/// Swipe direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDecision {
    Like,
    Dismiss,
}

impl SwipeDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDecision::Like => "like",
            SwipeDecision::Dismiss => "dismiss",
        }
    }
}

impl fmt::Display for SwipeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single undoable swipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSwipeRecord {
    pub name: String,
    pub decision: SwipeDecision,
    pub seq: u64,
}

/// Correlates a remote response with the local action that issued it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwipeTicket {
    pub key: String,
    pub seq: u64,
}

/// Household and user the session acts for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    #[serde(rename = "householdId")]
    pub household_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl SessionIdentity {
    /// Returns `None` unless both identifiers are present
    pub fn new(household_id: impl Into<String>, user_id: impl Into<String>) -> Option<Self> {
        let household_id = household_id.into();
        let user_id = user_id.into();
        if household_id.trim().is_empty() || user_id.trim().is_empty() {
            return None;
        }
        Some(Self {
            household_id,
            user_id,
        })
    }
}

/// Raised once when a like turns out to be mutual within the household
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub name: String,
    pub gender: Gender,
    pub seq: u64,
    #[serde(rename = "detectedAt")]
    pub detected_at: chrono::DateTime<chrono::Utc>,
}

/// Household match as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRow {
    #[serde(rename = "nameId")]
    pub name_id: String,
    pub name: String,
    pub gender: String,
    #[serde(rename = "likesCount")]
    pub likes_count: u32,
}

/// A name the user liked, as recorded by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedName {
    #[serde(rename = "nameId")]
    pub name_id: String,
    pub name: String,
    pub gender: String,
    #[serde(rename = "setTitle")]
    pub set_title: String,
}

/// Per-user decision totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeCounts {
    pub likes: u64,
    pub dismisses: u64,
}
