use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Key under which the serialized exclusion set is stored
pub const SWIPED_NAMES_KEY: &str = "swiped_names";

/// Key under which the user's own likes are stored
pub const LIKED_NAMES_KEY: &str = "local_likes";

/// Errors that can occur when persisting local state
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Key-value persistence for local swipe history
///
/// The store sees only opaque serialized values; encoding lives in
/// [`encode_exclusions`] / [`decode_exclusions`] and [`encode_likes`] /
/// [`decode_likes`].
pub trait ExclusionStore: Send + Sync + 'static {
    fn load(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn save(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn clear(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Serialize as a sorted JSON array of lowercase names
pub fn encode_exclusions(names: &BTreeSet<String>) -> Result<String, StoreError> {
    Ok(serde_json::to_string(names)?)
}

pub fn decode_exclusions(value: &str) -> Result<HashSet<String>, StoreError> {
    let names: Vec<String> = serde_json::from_str(value)?;
    Ok(names.into_iter().map(|n| n.to_lowercase()).collect())
}

/// Serialize the likes list as a JSON array, keeping like order
pub fn encode_likes(names: &[String]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(names)?)
}

pub fn decode_likes(value: &str) -> Result<Vec<String>, StoreError> {
    Ok(serde_json::from_str(value)?)
}

/// Load the likes list, treating any failure as "no likes yet"
pub async fn load_likes<S: ExclusionStore>(store: &S) -> Vec<String> {
    let raw = match store.load(LIKED_NAMES_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!("Failed to load local likes, starting fresh: {}", e);
            return Vec::new();
        }
    };

    decode_likes(&raw).unwrap_or_else(|e| {
        tracing::warn!("Discarding unreadable local likes: {}", e);
        Vec::new()
    })
}

/// Load the exclusion set, treating any failure as "nothing swiped yet"
pub async fn load_exclusions<S: ExclusionStore>(store: &S) -> HashSet<String> {
    let raw = match store.load(SWIPED_NAMES_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return HashSet::new(),
        Err(e) => {
            tracing::warn!("Failed to load swiped names, starting fresh: {}", e);
            return HashSet::new();
        }
    };

    match decode_exclusions(&raw) {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!("Discarding unreadable swiped names: {}", e);
            HashSet::new()
        }
    }
}

/// SQLite-backed store
pub struct SqliteExclusionStore {
    pool: SqlitePool,
}

impl SqliteExclusionStore {
    /// Open (creating if needed) the database at `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        tracing::info!("Opening local state database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

impl ExclusionStore for SqliteExclusionStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn save(&self, key: &str, value: String) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value)
            VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        tracing::info!("Cleared {} ({} rows)", key, result.rows_affected());
        Ok(())
    }
}

/// In-process store, used when no database is configured and in tests
#[derive(Debug, Default)]
pub struct MemoryExclusionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryExclusionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: impl Into<String>) -> Self {
        let store = Self::default();
        store.put(key, value.into());
        store
    }

    fn put(&self, key: &str, value: String) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
    }

    /// Current raw value under `key`
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl ExclusionStore for MemoryExclusionStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.snapshot(key))
    }

    async fn save(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.put(key, value);
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn test_encode_is_sorted_json_array() {
        let names: BTreeSet<String> = ["rex", "bella"].iter().map(|s| s.to_string()).collect();
        assert_eq!(encode_exclusions(&names).unwrap(), r#"["bella","rex"]"#);
    }

    #[test]
    fn test_decode_lowercases() {
        let names = decode_exclusions(r#"["Luna","REX"]"#).unwrap();
        assert!(names.contains("luna"));
        assert!(names.contains("rex"));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryExclusionStore::new();
        assert_ok!(tokio_test::block_on(store.save(SWIPED_NAMES_KEY, r#"["luna"]"#.to_string())));

        let loaded = tokio_test::block_on(load_exclusions(&store));
        assert_eq!(loaded.len(), 1);

        assert_ok!(tokio_test::block_on(store.clear(SWIPED_NAMES_KEY)));
        assert!(store.snapshot(SWIPED_NAMES_KEY).is_none());
    }

    #[test]
    fn test_corrupt_value_loads_empty() {
        let store = MemoryExclusionStore::with_value(SWIPED_NAMES_KEY, "{not a list");
        let loaded = tokio_test::block_on(load_exclusions(&store));
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_likes_keep_order_and_key() {
        let likes = vec!["Storm".to_string(), "Luna".to_string()];
        let store = MemoryExclusionStore::new();
        assert_ok!(tokio_test::block_on(
            store.save(LIKED_NAMES_KEY, encode_likes(&likes).unwrap())
        ));

        assert_eq!(tokio_test::block_on(load_likes(&store)), likes);
        assert!(tokio_test::block_on(load_exclusions(&store)).is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("state.db").display());

        {
            let store = SqliteExclusionStore::connect(&url, 1).await.unwrap();
            assert!(store.load(SWIPED_NAMES_KEY).await.unwrap().is_none());
            store.save(SWIPED_NAMES_KEY, r#"["luna","rex"]"#.to_string()).await.unwrap();
            store.save(SWIPED_NAMES_KEY, r#"["luna"]"#.to_string()).await.unwrap();
            store.save(LIKED_NAMES_KEY, r#"["Luna"]"#.to_string()).await.unwrap();
            assert!(store.health_check().await.unwrap());
            store.close().await;
        }

        let reopened = SqliteExclusionStore::connect(&url, 1).await.unwrap();
        let names = load_exclusions(&reopened).await;
        assert_eq!(names.len(), 1);
        assert!(names.contains("luna"));
        assert_eq!(load_likes(&reopened).await, vec!["Luna".to_string()]);

        reopened.clear(SWIPED_NAMES_KEY).await.unwrap();
        assert!(reopened.load(SWIPED_NAMES_KEY).await.unwrap().is_none());
        assert!(reopened.load(LIKED_NAMES_KEY).await.unwrap().is_some());
    }
}
