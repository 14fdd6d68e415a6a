use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::domain::error::ApplicationError;
use crate::presentation::AppState;
use crate::presentation::http::app_error::AppError;

pub(crate) async fn request_timeout(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    tokio::time::timeout(state.request_timeout, next.run(request))
        .await
        .map_err(|_| AppError::from(ApplicationError::new("Request timed out").with_status(408)))
}
