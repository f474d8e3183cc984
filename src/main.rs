use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use petname_swipe::config::Settings;
use petname_swipe::core::{CatalogIndex, SwipeSession};
use petname_swipe::routes::{self, AppState};
use petname_swipe::services::{SqliteExclusionStore, SupabaseClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(default_level: &str, default_format: &str) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| default_level.to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| default_format.to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();

    match &settings {
        Ok(s) => init_logging(&s.logging.level, &s.logging.format),
        Err(_) => init_logging("info", "json"),
    }

    info!("Starting petname swipe service...");

    let settings = settings.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    info!("Configuration loaded successfully");

    let catalog = Arc::new(CatalogIndex::load(&settings.catalog.dataset_path));
    if catalog.is_empty() {
        warn!("Catalog is empty, the stack will stay empty");
    }

    let store = Arc::new(
        SqliteExclusionStore::connect(
            &settings.storage.database_url,
            settings.storage.max_connections.unwrap_or(1),
        )
        .await
        .map_err(|e| {
            error!("Failed to open local state database: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e)
        })?,
    );

    let remote = Arc::new(
        SupabaseClient::new(
            settings.supabase.url.clone(),
            settings.supabase.anon_key.clone(),
            settings.supabase.access_token.clone(),
            Duration::from_secs(settings.supabase.timeout_secs.unwrap_or(10)),
        )
        .map_err(|e| {
            error!("Failed to build Supabase client: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e)
        })?,
    );

    info!("Supabase client initialized for {}", settings.supabase.url);

    let identity = settings.identity();
    if let Some(identity) = &identity {
        info!("Swiping for household {} as {}", identity.household_id, identity.user_id);
    }

    let session = Arc::new(
        SwipeSession::start(
            Arc::clone(&catalog),
            Arc::clone(&remote),
            Arc::clone(&store),
            identity,
            settings.facets.clone(),
            settings.catalog.stack_size.unwrap_or(10_000),
        )
        .await,
    );

    let app_state = AppState::new(
        Arc::clone(&session),
        catalog,
        remote,
        settings.catalog.pending_capacity.unwrap_or(100),
    );

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(2);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes::<SupabaseClient, SqliteExclusionStore>)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await?;

    info!("Server stopped, waiting for remote sync to finish");
    if tokio::time::timeout(Duration::from_secs(5), session.settle()).await.is_err() {
        warn!("Remote sync still running, abandoning it");
    }
    session.end();
    store.close().await;

    Ok(())
}
