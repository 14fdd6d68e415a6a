use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::user_service::UserService;
use crate::infrastructure::database::Database;
use crate::infrastructure::settings::RunMode;
use crate::presentation::http::error_classifier::ErrorResponder;
use crate::presentation::http::middleware::rate_limit::IpRateLimiter;

pub(crate) mod http;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) mode: RunMode,
    pub(crate) db: Database,
    pub(crate) users: Arc<UserService>,
    pub(crate) responder: Arc<ErrorResponder>,
    pub(crate) rate_limiter: Arc<IpRateLimiter>,
    pub(crate) request_timeout: Duration,
    pub(crate) started_at: Instant,
}

impl AppState {
    pub(crate) fn new(
        mode: RunMode,
        db: Database,
        users: Arc<UserService>,
        responder: Arc<ErrorResponder>,
        rate_limiter: Arc<IpRateLimiter>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            mode,
            db,
            users,
            responder,
            rate_limiter,
            request_timeout,
            started_at: Instant::now(),
        }
    }
}
