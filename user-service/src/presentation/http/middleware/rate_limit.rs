use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Result, anyhow};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::domain::error::ApplicationError;
use crate::presentation::AppState;
use crate::presentation::http::app_error::AppError;

pub(crate) type IpRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// `max_requests` per client IP within `window`, all of them usable as a burst.
pub(crate) fn build_rate_limiter(max_requests: u32, window: Duration) -> Result<IpRateLimiter> {
    let burst =
        NonZeroU32::new(max_requests).ok_or_else(|| anyhow!("max_requests must be > 0"))?;
    let replenish_interval = window / burst.get();

    let quota = Quota::with_period(replenish_interval)
        .ok_or_else(|| anyhow!("invalid rate limit period"))?
        .allow_burst(burst);

    Ok(RateLimiter::keyed(quota))
}

pub(crate) async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);
    state
        .rate_limiter
        .check_key(&ip)
        .map_err(|_| ApplicationError::too_many_requests())?;

    Ok(next.run(request).await)
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use super::build_rate_limiter;

    #[test]
    fn quota_is_per_ip() {
        let limiter = build_rate_limiter(2, Duration::from_secs(900)).expect("valid quota");
        let first = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let second = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiter.check_key(&first).is_ok());
        assert!(limiter.check_key(&first).is_ok());
        assert!(limiter.check_key(&first).is_err());
        assert!(limiter.check_key(&second).is_ok());
    }

    #[test]
    fn zero_requests_is_rejected() {
        assert!(build_rate_limiter(0, Duration::from_secs(60)).is_err());
    }
}
