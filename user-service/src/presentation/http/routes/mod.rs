use axum::{Router, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{health::health, landing::landing, not_found::route_not_found};
use super::openapi::ApiDoc;
use crate::presentation::AppState;

pub(crate) mod users;

pub(crate) fn router(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/users", users::router());

    let router = if state.mode.exposes_docs() {
        router
            .route("/", get(landing))
            .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    // known path with an unrouted method is reported like an unknown route
    router
        .fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
}
