use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Browsers may reuse a preflight answer for this long.
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Which browser origins may call the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CorsPolicy {
    /// Any origin, without cookies. Signed-in routes then only work same-site.
    Anyone,
    /// Listed origins only; they get the session cookie.
    Trusted(Vec<HeaderValue>),
}

impl CorsPolicy {
    pub(crate) fn from_origins(origins: &[String]) -> Result<Self> {
        if origins.iter().any(|origin| origin == "*") {
            return Ok(Self::Anyone);
        }

        origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("invalid CORS origin {origin:?}"))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::Trusted)
    }

    fn layer(self) -> CorsLayer {
        let layer = match self {
            Self::Anyone => CorsLayer::new().allow_origin(Any),
            Self::Trusted(origins) => CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true),
        };

        // the user routes only read and post
        layer
            .allow_methods([Method::GET, Method::HEAD, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .max_age(PREFLIGHT_MAX_AGE)
    }
}

pub(crate) fn apply_cors(router: Router, origins: &[String]) -> Result<Router> {
    let policy = CorsPolicy::from_origins(origins)?;
    Ok(router.layer(policy.layer()))
}
