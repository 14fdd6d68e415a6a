use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_sessions::MemoryStore;
use tracing::{info, warn};

mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod server;
#[cfg(test)]
mod testing;

use application::user_service::UserService;
use data::repositories::postgres::user_repository::PostgresUserRepository;
use infrastructure::cache::Cache;
use infrastructure::database::Database;
use infrastructure::logging::init_logging;
use infrastructure::session_store::{AppSessionStore, RedisSessionStore};
use infrastructure::settings::Settings;
use presentation::AppState;
use presentation::http::error_classifier::{ErrorResponder, TracingErrorLog};
use presentation::http::middleware::rate_limit::build_rate_limiter;

const CACHE_KEY_PREFIX: &str = "cache:";
const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    if std::env::var("APP_ENV").is_ok_and(|env| env == "test") {
        dotenvy::from_filename_override(".env.test").ok();
    }
    let settings = Settings::from_env()?;

    let _log_guard = init_logging(&settings.log_level, settings.mode, &settings.log_dir)?;
    info!(mode = %settings.mode, "starting user-service");

    let db = Database::new(&settings)?;
    db.connect().await?;
    db.run_migrations().await?;

    let (cache, store) = match settings.redis_url.as_deref() {
        Some(url) => {
            let client = redis::Client::open(url).context("REDIS_URL is not a valid redis url")?;
            let cache = Cache::new(url, CACHE_KEY_PREFIX)?;
            let store = RedisSessionStore::new(client, settings.session_key_prefix.clone());
            info!("redis session store and cache enabled");
            (Some(cache), AppSessionStore::Redis(store))
        }
        None => {
            warn!("REDIS_URL is not set, sessions stay in memory and caching is disabled");
            (None, AppSessionStore::Memory(MemoryStore::default()))
        }
    };

    let repo = Arc::new(PostgresUserRepository::new(db.pool().clone()));
    let users = UserService::new(repo, cache, Duration::from_secs(settings.cache_ttl_secs));

    let responder = ErrorResponder::new(Arc::new(TracingErrorLog), settings.mode);

    let rate_limiter = Arc::new(build_rate_limiter(
        settings.rate_limit_max_requests,
        Duration::from_secs(settings.rate_limit_window_secs),
    )?);
    let sweeper = Arc::clone(&rate_limiter);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.retain_recent();
        }
    });

    let state = AppState::new(
        settings.mode,
        db.clone(),
        Arc::new(users),
        Arc::new(responder),
        rate_limiter,
        Duration::from_secs(settings.http_request_timeout_secs),
    );

    let served = server::run_http(&settings, state, store).await;
    db.disconnect().await;
    served
}
