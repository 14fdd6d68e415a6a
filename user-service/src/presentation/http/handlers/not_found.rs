use axum::http::{Method, Uri};

use crate::domain::error::ApplicationError;
use crate::presentation::http::app_error::AppError;

pub(crate) async fn route_not_found(method: Method, uri: Uri) -> AppError {
    ApplicationError::not_found(format!("Can't find {method} {} on this server", uri.path())).into()
}
