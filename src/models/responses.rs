use crate::core::session::SessionStats;
use crate::models::domain::{LikedName, LocalSwipeRecord, MatchEvent, MatchRow, NameEntry, NameSet};
use serde::{Deserialize, Serialize};

/// Current stack, top card first
#[derive(Debug, Clone, Serialize)]
pub struct StackResponse {
    pub names: Vec<NameEntry>,
    pub total: usize,
}

/// Result of a like or dismiss
#[derive(Debug, Clone, Serialize)]
pub struct SwipeResponse {
    /// `None` when there was nothing to swipe
    pub swiped: Option<NameEntry>,
    pub next: Option<NameEntry>,
    pub remaining: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UndoResponse {
    pub undone: Option<LocalSwipeRecord>,
    pub next: Option<NameEntry>,
}

/// Stack size after a facet change or history reset
#[derive(Debug, Clone, Serialize)]
pub struct StackUpdateResponse {
    pub remaining: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "sessionId")]
    pub session_id: uuid::Uuid,
    pub catalog: usize,
    pub session: SessionStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetsResponse {
    pub sets: Vec<NameSet>,
    pub languages: Vec<String>,
    pub styles: Vec<String>,
}

/// Household matches as listed by the backend
#[derive(Debug, Clone, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchRow>,
}

/// Matches raised by this session since the last poll
#[derive(Debug, Clone, Serialize)]
pub struct PendingMatchesResponse {
    pub matches: Vec<MatchEvent>,
}

/// The user's own likes
///
/// `local` is always present and reflects this device; `remote` is the
/// backend's view and is `None` when the backend is unconfigured or failed.
#[derive(Debug, Clone, Serialize)]
pub struct LikesResponse {
    pub local: Vec<String>,
    pub remote: Option<Vec<LikedName>>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
