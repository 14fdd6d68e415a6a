use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
    Test,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Development => "development",
            RunMode::Production => "production",
            RunMode::Test => "test",
        }
    }

    pub fn is_development(self) -> bool {
        self == RunMode::Development
    }

    pub fn is_production(self) -> bool {
        self == RunMode::Production
    }

    /// Landing page and API docs are only served outside production.
    pub fn exposes_docs(self) -> bool {
        matches!(self, RunMode::Development | RunMode::Test)
    }
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RunMode::Development),
            "production" | "prod" => Ok(RunMode::Production),
            "test" => Ok(RunMode::Test),
            other => Err(anyhow!(
                "unknown APP_ENV '{other}', expecting development, production or test"
            )),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: RunMode,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub redis_url: Option<String>,
    pub session_secret: String,
    pub session_ttl_secs: u64,
    pub session_key_prefix: String,
    pub cache_ttl_secs: u64,
    pub http_addr: String,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    /// Per-level log files are written here in production.
    pub log_dir: PathBuf,
    pub http_request_body_limit_bytes: usize,
    pub http_request_timeout_secs: u64,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
}

impl Settings {
    pub const MIN_SESSION_SECRET_BYTES: usize = 64;

    pub fn from_env() -> Result<Self> {
        let mode = match std::env::var("APP_ENV") {
            Ok(raw) => raw.parse()?,
            Err(_) => RunMode::Development,
        };

        let database_url = get_required("DATABASE_URL").context("DATABASE_URL is required")?;
        let session_secret =
            get_required("SESSION_SECRET").context("SESSION_SECRET is required")?;
        if session_secret.len() < Self::MIN_SESSION_SECRET_BYTES {
            return Err(anyhow!(
                "SESSION_SECRET must be at least {} bytes",
                Self::MIN_SESSION_SECRET_BYTES
            ));
        }

        let redis_url = std::env::var("REDIS_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let http_addr = std::env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let cors_origins =
            parse_cors_origins(std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));
        let log_level = std::env::var("LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());
        let log_dir = std::env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("logs"));
        let session_key_prefix =
            std::env::var("SESSION_KEY_PREFIX").unwrap_or_else(|_| "sessions:".to_string());

        Ok(Self {
            mode,
            database_url,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout_secs: parse_env("DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            redis_url,
            session_secret,
            session_ttl_secs: parse_env("SESSION_TTL_SECS", 30 * 60)?,
            session_key_prefix,
            cache_ttl_secs: parse_env("CACHE_TTL_SECS", 300)?,
            http_addr,
            cors_origins,
            log_level,
            log_dir,
            http_request_body_limit_bytes: parse_env(
                "HTTP_REQUEST_BODY_LIMIT_BYTES",
                100 * 1024 * 1024,
            )?,
            http_request_timeout_secs: parse_env("HTTP_REQUEST_TIMEOUT_SECS", 30)?,
            rate_limit_max_requests: parse_env("RATE_LIMIT_MAX_REQUESTS", 100)?,
            rate_limit_window_secs: parse_env("RATE_LIMIT_WINDOW_SECS", 15 * 60)?,
        })
    }
}

fn get_required(key: &str) -> Result<String> {
    let value = std::env::var(key)?;
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(anyhow!("{key} must not be empty"));
    }
    Ok(value)
}

fn parse_cors_origins(raw: String) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + PartialEq + Default,
{
    let value = match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow!("Failed to parse {key}, expecting positive integer"))?,
        Err(_) => default,
    };

    if value == T::default() {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{RunMode, parse_cors_origins};

    #[test]
    fn run_mode_parses_known_values() {
        assert_eq!("production".parse::<RunMode>().unwrap(), RunMode::Production);
        assert_eq!(" Dev ".parse::<RunMode>().unwrap(), RunMode::Development);
        assert_eq!("test".parse::<RunMode>().unwrap(), RunMode::Test);
        assert!("staging".parse::<RunMode>().is_err());
    }

    #[test]
    fn docs_are_hidden_in_production() {
        assert!(RunMode::Development.exposes_docs());
        assert!(RunMode::Test.exposes_docs());
        assert!(!RunMode::Production.exposes_docs());
    }

    #[test]
    fn cors_origins_skip_blank_entries() {
        let origins = parse_cors_origins(" http://a.test , ,http://b.test".to_string());
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }
}
