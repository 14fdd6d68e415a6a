use axum::{
    Router,
    routing::{get, post},
};

use crate::presentation::AppState;
use crate::presentation::http::handlers::users::{get_user, login, logout, me, register};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/{id}", get(get_user))
}
