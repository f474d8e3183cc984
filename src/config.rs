use crate::models::{Facets, SessionIdentity};
use config::{Config, ConfigError, Environment, File};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub supabase: SupabaseSettings,
    #[serde(default)]
    pub session: SessionSettings,
    pub catalog: CatalogSettings,
    pub storage: StorageSettings,
    #[serde(default)]
    pub facets: Facets,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSettings {
    pub url: String,
    pub anon_key: String,
    /// Signed-in user's JWT; the anon key is used as bearer when absent
    #[serde(default)]
    pub access_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Household context for the session
///
/// Both ids must be present for remote sync; `user_id` falls back to the
/// access token's `sub` claim.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub household_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    pub dataset_path: String,
    pub stack_size: Option<usize>,
    /// Matches kept for `GET /matches/pending` before the oldest are dropped
    pub pending_capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// e.g. `sqlite://data/state.db`, or `sqlite::memory:` with one connection
    pub database_url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: String,
}

/// Read the `sub` claim of a JWT without verifying its signature
///
/// The token is only forwarded to the backend, which does the verification;
/// locally it is just a source for the user id.
pub fn user_id_from_token(token: &str) -> Option<String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) if !data.claims.sub.trim().is_empty() => Some(data.claims.sub),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Could not read user id from access token: {}", e);
            None
        }
    }
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Configuration file (config/default.toml)
    /// 2. Local overrides (config/local.toml)
    /// 3. Environment variables (prefixed with PETNAMES__)
    /// 4. SUPABASE_URL, SUPABASE_ANON_KEY, SUPABASE_ACCESS_TOKEN, DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PETNAMES__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("PETNAMES")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("PETNAMES")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Household identity, or `None` when either id is missing
    pub fn identity(&self) -> Option<SessionIdentity> {
        let user_id = self
            .session
            .user_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| {
                self.supabase
                    .access_token
                    .as_deref()
                    .and_then(user_id_from_token)
            })?;

        SessionIdentity::new(self.session.household_id.clone()?, user_id)
    }
}

/// Apply the conventional unprefixed variables on top of the layered config
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    for (var, key) in [
        ("SUPABASE_URL", "supabase.url"),
        ("SUPABASE_ANON_KEY", "supabase.anon_key"),
        ("SUPABASE_ACCESS_TOKEN", "supabase.access_token"),
        ("DATABASE_URL", "storage.database_url"),
    ] {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
