use crate::models::{Gender, LikedName, MatchRow, SwipeCounts, SwipeDecision};
use std::future::Future;
use thiserror::Error;

/// Errors that can occur when talking to the remote backend
///
/// All of these are transient from the swipe session's point of view: they are
/// logged and suppressed, never shown to the user.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// What the backend said about a recorded decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    /// `Some` when the backend reports mutual-like status inline
    pub is_mutual_like: Option<bool>,
}

/// Remote store of household swipe decisions
///
/// Implementations own their own timeouts and retries; callers treat every
/// call as best-effort.
pub trait RemoteSync: Send + Sync + 'static {
    fn record_decision(
        &self,
        household_id: &str,
        user_id: &str,
        name: &str,
        gender: Gender,
        decision: SwipeDecision,
    ) -> impl Future<Output = Result<RecordOutcome, RemoteError>> + Send;

    /// Authoritative check whether at least two members like `name`
    fn check_mutual_like(
        &self,
        household_id: &str,
        name: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<bool, RemoteError>> + Send;

    fn delete_decision(
        &self,
        household_id: &str,
        user_id: &str,
        name: &str,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// All names liked by two or more household members
    fn fetch_matches(
        &self,
        household_id: &str,
    ) -> impl Future<Output = Result<Vec<MatchRow>, RemoteError>> + Send;

    /// Names `user_id` has liked in the household
    fn fetch_likes(
        &self,
        household_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<LikedName>, RemoteError>> + Send;

    /// Like and dismiss totals for `user_id`
    fn fetch_counts(
        &self,
        household_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<SwipeCounts, RemoteError>> + Send;
}
