use axum::extract::{FromRequest, FromRequestParts};

use super::app_error::AppError;

/// `Json` whose rejections go through the error responder.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub(crate) struct AppJson<T>(pub(crate) T);

/// `Path` whose parse failures become cast errors.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub(crate) struct AppPath<T>(pub(crate) T);
