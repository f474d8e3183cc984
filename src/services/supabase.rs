use crate::models::{Gender, LikedName, MatchRow, SwipeCounts, SwipeDecision};
use crate::services::remote::{RecordOutcome, RemoteError, RemoteSync};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const SWIPE_BY_NAME: &str = "swipe_by_name";
const CHECK_MATCH_BY_NAME: &str = "check_match_by_name";
const DELETE_SWIPE_BY_NAME: &str = "delete_swipe_by_name";
const HOUSEHOLD_MATCHES: &str = "household_matches";
const SWIPES: &str = "swipes";

#[derive(Debug, Deserialize)]
struct MatchViewRow {
    name_id: Value,
    likes_count: u32,
    names: MatchNameData,
}

#[derive(Debug, Deserialize)]
struct MatchNameData {
    name: String,
    gender: String,
}

#[derive(Debug, Deserialize)]
struct LikeViewRow {
    name_id: Value,
    names: Option<LikedNameData>,
}

#[derive(Debug, Deserialize)]
struct LikedNameData {
    name: String,
    gender: String,
    name_sets: Option<SetTitleData>,
}

#[derive(Debug, Deserialize)]
struct SetTitleData {
    title: String,
}

fn id_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Total row count from a PostgREST `Content-Range` header (`0-9/42`, `*/0`)
pub(crate) fn parse_content_range_total(header: &str) -> Result<u64, RemoteError> {
    header
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
        .ok_or_else(|| RemoteError::InvalidResponse(format!("Unexpected Content-Range: {}", header)))
}

/// Supabase (PostgREST) client
///
/// Swipes go through RPC functions that resolve names server-side, so the
/// client never needs backend name ids:
/// - `swipe_by_name` records a decision and may report the match inline
/// - `check_match_by_name` is the authoritative mutual-like check
/// - `delete_swipe_by_name` reverts a decision on undo
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
    client: Client,
}

impl SupabaseClient {
    /// Create a new Supabase client
    pub fn new(
        base_url: String,
        anon_key: String,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            access_token,
            client,
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.as_deref().unwrap_or(&self.anon_key))
    }

    /// Invoke an RPC function and return its decoded body (`Null` when empty)
    async fn rpc(&self, function: &str, params: Value) -> Result<Value, RemoteError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);

        tracing::debug!("Calling RPC {}", function);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", self.bearer())
            .json(&params)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Exact number of the user's swipes with `decision`
    async fn count_decisions(
        &self,
        household_id: &str,
        user_id: &str,
        decision: SwipeDecision,
    ) -> Result<u64, RemoteError> {
        let url = format!(
            "{}/rest/v1/{}?select=name_id&household_id=eq.{}&user_id=eq.{}&decision=eq.{}",
            self.base_url,
            SWIPES,
            urlencoding::encode(household_id),
            urlencoding::encode(user_id),
            decision.as_str()
        );

        let response = self
            .client
            .head(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", self.bearer())
            .header("Prefer", "count=exact")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthorized);
        }
        if !status.is_success() {
            return Err(RemoteError::ApiError {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RemoteError::InvalidResponse("Missing Content-Range".to_string()))?;

        parse_content_range_total(range)
    }

    async fn decode(response: reqwest::Response) -> Result<Value, RemoteError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthorized);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(RemoteError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| RemoteError::InvalidResponse(format!("Failed to parse body: {}", e)))
    }
}

/// Extract the `is_match` flag from an RPC result
///
/// PostgREST returns functions as a bare scalar, an object, a one-row array or
/// nothing at all depending on how the function is declared.
pub(crate) fn parse_match_flag(value: &Value) -> Result<Option<bool>, RemoteError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::Object(obj) => Ok(obj.get("is_match").and_then(Value::as_bool)),
        Value::Array(rows) => match rows.first() {
            Some(row) => parse_match_flag(row),
            None => Ok(None),
        },
        other => Err(RemoteError::InvalidResponse(format!(
            "Unexpected match payload: {}",
            other
        ))),
    }
}

impl RemoteSync for SupabaseClient {
    async fn record_decision(
        &self,
        household_id: &str,
        user_id: &str,
        name: &str,
        gender: Gender,
        decision: SwipeDecision,
    ) -> Result<RecordOutcome, RemoteError> {
        let result = self
            .rpc(
                SWIPE_BY_NAME,
                json!({
                    "p_household_id": household_id,
                    "p_name": name,
                    "p_gender": gender.as_str(),
                    "p_decision": decision.as_str(),
                }),
            )
            .await?;

        let is_mutual_like = parse_match_flag(&result)?;

        tracing::debug!(
            "Recorded {} for {} by {} (mutual: {:?})",
            decision,
            name,
            user_id,
            is_mutual_like
        );

        Ok(RecordOutcome { is_mutual_like })
    }

    async fn check_mutual_like(
        &self,
        household_id: &str,
        name: &str,
        user_id: &str,
    ) -> Result<bool, RemoteError> {
        let result = self
            .rpc(
                CHECK_MATCH_BY_NAME,
                json!({
                    "p_household_id": household_id,
                    "p_name": name,
                    "p_user_id": user_id,
                }),
            )
            .await?;

        Ok(parse_match_flag(&result)?.unwrap_or(false))
    }

    async fn delete_decision(
        &self,
        household_id: &str,
        user_id: &str,
        name: &str,
    ) -> Result<(), RemoteError> {
        self.rpc(
            DELETE_SWIPE_BY_NAME,
            json!({
                "p_household_id": household_id,
                "p_user_id": user_id,
                "p_name": name,
            }),
        )
        .await?;

        tracing::debug!("Deleted decision for {} by {}", name, user_id);
        Ok(())
    }

    async fn fetch_matches(&self, household_id: &str) -> Result<Vec<MatchRow>, RemoteError> {
        let url = format!(
            "{}/rest/v1/{}?select={}&household_id=eq.{}&order=likes_count.desc",
            self.base_url,
            HOUSEHOLD_MATCHES,
            urlencoding::encode("name_id,likes_count,names!inner(name,gender)"),
            urlencoding::encode(household_id)
        );

        tracing::debug!("Fetching matches for household: {}", household_id);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", self.bearer())
            .send()
            .await?;

        let body = Self::decode(response).await?;
        let rows: Vec<MatchViewRow> = serde_json::from_value(body)
            .map_err(|e| RemoteError::InvalidResponse(format!("Failed to parse matches: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|row| MatchRow {
                name_id: id_string(row.name_id),
                name: row.names.name,
                gender: row.names.gender,
                likes_count: row.likes_count,
            })
            .collect())
    }

    async fn fetch_likes(&self, household_id: &str, user_id: &str) -> Result<Vec<LikedName>, RemoteError> {
        let url = format!(
            "{}/rest/v1/{}?select={}&household_id=eq.{}&user_id=eq.{}&decision=eq.like",
            self.base_url,
            SWIPES,
            urlencoding::encode("name_id,names!inner(name,gender,name_sets!inner(title))"),
            urlencoding::encode(household_id),
            urlencoding::encode(user_id)
        );

        tracing::debug!("Fetching likes for {} in household {}", user_id, household_id);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", self.bearer())
            .send()
            .await?;

        let body = Self::decode(response).await?;
        let rows: Vec<LikeViewRow> = serde_json::from_value(body)
            .map_err(|e| RemoteError::InvalidResponse(format!("Failed to parse likes: {}", e)))?;

        // Swipes whose name row is gone are skipped
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let names = row.names?;
                Some(LikedName {
                    name_id: id_string(row.name_id),
                    name: names.name,
                    gender: names.gender,
                    set_title: names
                        .name_sets
                        .map(|s| s.title)
                        .unwrap_or_else(|| "Unknown".to_string()),
                })
            })
            .collect())
    }

    async fn fetch_counts(&self, household_id: &str, user_id: &str) -> Result<SwipeCounts, RemoteError> {
        let likes = self
            .count_decisions(household_id, user_id, SwipeDecision::Like)
            .await?;
        let dismisses = self
            .count_decisions(household_id, user_id, SwipeDecision::Dismiss)
            .await?;

        Ok(SwipeCounts { likes, dismisses })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn create_client(url: String) -> SupabaseClient {
        SupabaseClient::new(url, "anon".to_string(), None, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_match_flag_shapes() {
        assert_eq!(parse_match_flag(&Value::Null).unwrap(), None);
        assert_eq!(parse_match_flag(&json!(true)).unwrap(), Some(true));
        assert_eq!(parse_match_flag(&json!({"is_match": false})).unwrap(), Some(false));
        assert_eq!(parse_match_flag(&json!([{"is_match": true}])).unwrap(), Some(true));
        assert_eq!(parse_match_flag(&json!([])).unwrap(), None);
        assert_eq!(parse_match_flag(&json!({"other": 1})).unwrap(), None);
        assert!(parse_match_flag(&json!("yes")).is_err());
    }

    #[test]
    fn test_client_creation_trims_url() {
        let client = create_client("https://project.supabase.co/".to_string());
        assert_eq!(client.base_url, "https://project.supabase.co");
        assert_eq!(client.bearer(), "Bearer anon");
    }

    #[tokio::test]
    async fn test_record_decision_reads_inline_match() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/rpc/swipe_by_name")
            .match_header("apikey", "anon")
            .match_body(Matcher::PartialJson(json!({
                "p_household_id": "house-1",
                "p_name": "Luna",
                "p_gender": "female",
                "p_decision": "like",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"is_match": true}]"#)
            .create_async()
            .await;

        let client = create_client(server.url());
        let outcome = client
            .record_decision("house-1", "user-1", "Luna", Gender::Female, SwipeDecision::Like)
            .await
            .unwrap();

        assert_eq!(outcome.is_mutual_like, Some(true));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/v1/rpc/check_match_by_name")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = create_client(server.url());
        let err = client
            .check_mutual_like("house-1", "Luna", "user-1")
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::ApiError { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unauthorized_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/v1/rpc/delete_swipe_by_name")
            .with_status(401)
            .create_async()
            .await;

        let client = create_client(server.url());
        let err = client.delete_decision("house-1", "user-1", "Luna").await.unwrap_err();

        assert!(matches!(err, RemoteError::Unauthorized));
    }

    #[tokio::test]
    async fn test_void_rpc_body_is_accepted() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/v1/rpc/delete_swipe_by_name")
            .with_status(204)
            .create_async()
            .await;

        let client = create_client(server.url());
        assert!(client.delete_decision("house-1", "user-1", "Luna").await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_matches_maps_rows() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/household_matches")
            .match_query(Matcher::UrlEncoded(
                "household_id".to_string(),
                "eq.house-1".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"name_id":"a1","likes_count":3,"names":{"name":"Luna","gender":"female"}},
                    {"name_id":7,"likes_count":2,"names":{"name":"Rex","gender":"male"}}]"#,
            )
            .create_async()
            .await;

        let client = create_client(server.url());
        let matches = client.fetch_matches("house-1").await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].name, "Luna");
        assert_eq!(matches[0].likes_count, 3);
        assert_eq!(matches[1].name_id, "7");
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-9/42").unwrap(), 42);
        assert_eq!(parse_content_range_total("*/0").unwrap(), 0);
        assert!(parse_content_range_total("0-9/*").is_err());
        assert!(parse_content_range_total("garbage").is_err());
    }

    #[tokio::test]
    async fn test_fetch_likes_maps_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/swipes")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("household_id".to_string(), "eq.house-1".to_string()),
                Matcher::UrlEncoded("user_id".to_string(), "eq.user-1".to_string()),
                Matcher::UrlEncoded("decision".to_string(), "eq.like".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"name_id":"a1","names":{"name":"Luna","gender":"female","name_sets":{"title":"Cute & Sweet"}}},
                    {"name_id":9,"names":{"name":"Rex","gender":"male","name_sets":null}},
                    {"name_id":"gone","names":null}]"#,
            )
            .create_async()
            .await;

        let client = create_client(server.url());
        let likes = client.fetch_likes("house-1", "user-1").await.unwrap();

        assert_eq!(likes.len(), 2);
        assert_eq!(likes[0].name, "Luna");
        assert_eq!(likes[0].set_title, "Cute & Sweet");
        assert_eq!(likes[1].name_id, "9");
        assert_eq!(likes[1].set_title, "Unknown");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_counts_reads_content_range() {
        let mut server = mockito::Server::new_async().await;
        let likes = server
            .mock("HEAD", "/rest/v1/swipes")
            .match_query(Matcher::UrlEncoded("decision".to_string(), "eq.like".to_string()))
            .match_header("prefer", "count=exact")
            .with_status(200)
            .with_header("content-range", "0-2/3")
            .create_async()
            .await;
        let dismisses = server
            .mock("HEAD", "/rest/v1/swipes")
            .match_query(Matcher::UrlEncoded("decision".to_string(), "eq.dismiss".to_string()))
            .with_status(200)
            .with_header("content-range", "*/0")
            .create_async()
            .await;

        let client = create_client(server.url());
        let counts = client.fetch_counts("house-1", "user-1").await.unwrap();

        assert_eq!(counts, SwipeCounts { likes: 3, dismisses: 0 });
        likes.assert_async().await;
        dismisses.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_counts_requires_content_range() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("HEAD", "/rest/v1/swipes")
            .match_query(Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let client = create_client(server.url());
        let err = client.fetch_counts("house-1", "user-1").await.unwrap_err();

        assert!(matches!(err, RemoteError::InvalidResponse(_)));
    }
}
