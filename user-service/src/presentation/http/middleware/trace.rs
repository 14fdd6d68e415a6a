use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::settings::RunMode;

pub(crate) fn apply_trace(router: Router, mode: RunMode) -> Router {
    // development also records request headers on the span
    let make_span = DefaultMakeSpan::new()
        .level(Level::INFO)
        .include_headers(mode.is_development());

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(make_span)
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}
