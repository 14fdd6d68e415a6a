use anyhow::{Result, anyhow};
use axum::Router;
use time::Duration;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::infrastructure::session_store::AppSessionStore;
use crate::infrastructure::settings::Settings;

pub(crate) const SESSION_COOKIE: &str = "sid";

pub(crate) fn apply_sessions<S>(
    router: Router<S>,
    settings: &Settings,
    store: AppSessionStore,
) -> Result<Router<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let key = Key::try_from(settings.session_secret.as_bytes())
        .map_err(|err| anyhow!("invalid SESSION_SECRET: {err}"))?;
    let ttl = i64::try_from(settings.session_ttl_secs)
        .map_err(|_| anyhow!("SESSION_TTL_SECS is too large"))?;

    let layer = SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Strict)
        .with_secure(settings.mode.is_production())
        .with_expiry(Expiry::OnInactivity(Duration::seconds(ttl)))
        .with_signed(key);

    Ok(router.layer(layer))
}
