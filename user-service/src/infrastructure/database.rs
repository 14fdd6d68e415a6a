use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use tracing::{error, info};

use super::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Disconnecting,
            _ => ConnectionState::Disconnected,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Disconnecting => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle over the Postgres pool.
///
/// The pool is built lazily; `connect` opens and verifies the first
/// connection so the server never accepts traffic against a dead database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    state: Arc<AtomicU8>,
}

impl Database {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut options: PgConnectOptions = settings
            .database_url
            .parse()
            .context("DATABASE_URL is not a valid postgres url")?;
        if settings.mode.is_production() {
            options = options.ssl_mode(PgSslMode::Require);
        }

        let pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(settings.db_acquire_timeout_secs))
            .connect_lazy_with(options);

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            state: Arc::new(AtomicU8::new(ConnectionState::Disconnected.as_u8())),
        }
    }

    pub async fn connect(&self) -> Result<()> {
        self.set_state(ConnectionState::Connecting);

        let verified = sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database connection could not be verified");

        match verified {
            Ok(_) => {
                self.set_state(ConnectionState::Connected);
                info!("database connection established and verified");
                Ok(())
            }
            Err(err) => {
                self.set_state(ConnectionState::Disconnected);
                error!(error = ?err, "database initialization failed");
                Err(err)
            }
        }
    }

    pub async fn disconnect(&self) {
        self.set_state(ConnectionState::Disconnecting);
        self.pool.close().await;
        self.set_state(ConnectionState::Disconnected);
        info!("database connection closed");
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run database migrations")?;
        info!("database migrations applied");
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}
