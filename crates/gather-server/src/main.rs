use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::routing::get;
use axum::{Router, middleware};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use gather_api::blacklist::TokenBlacklist;
use gather_api::jwt::AuthConfig;
use gather_api::middleware::require_auth;
use gather_api::routes;
use gather_api::state::{AppState, AppStateInner};
use gather_cache::Cache;
use gather_db::Database;
use gather_files::FileStore;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gather=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("GATHER_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: GATHER_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let host = std::env::var("GATHER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("GATHER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("GATHER_DB_PATH")
        .unwrap_or_else(|_| "gather.db".into())
        .into();
    let storage_dir: PathBuf = std::env::var("GATHER_STORAGE_DIR")
        .unwrap_or_else(|_| "./file-storage".into())
        .into();
    let issuer = std::env::var("GATHER_JWT_ISSUER").unwrap_or_else(|_| "gather".into());
    let audience = std::env::var("GATHER_JWT_AUDIENCE").unwrap_or_else(|_| "gather-clients".into());
    let token_minutes: u64 = std::env::var("GATHER_TOKEN_EXPIRY_MINUTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);
    let file_minutes: u64 = std::env::var("GATHER_FILE_EXPIRY_MINUTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    // Init DB, cache and file store
    let db = Arc::new(Database::open(&db_path)?);
    let cache = Arc::new(Cache::new());
    let files = FileStore::new(
        storage_dir,
        db.clone(),
        cache.clone(),
        Duration::from_secs(file_minutes * 60),
    )
    .await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        cache: cache.clone(),
        files,
        blacklist: TokenBlacklist::new(cache.clone()),
        auth: AuthConfig {
            secret: jwt_secret,
            issuer,
            audience,
            token_ttl: Duration::from_secs(token_minutes * 60),
        },
    });

    // Background cache sweep (runs every minute)
    tokio::spawn(run_cache_sweep(cache, 60));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(false);

    let protected = routes::protected_router()
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let app = Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Gather server listening on {}", addr);
    info!("Token lifetime: {} minutes, pending file window: {} minutes", token_minutes, file_minutes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// Drops expired cache entries so unread ones do not pile up.
async fn run_cache_sweep(cache: Arc<Cache>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        interval.tick().await;
        let removed = cache.purge_expired();
        if removed > 0 {
            info!("cache sweep removed {} expired entries", removed);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
