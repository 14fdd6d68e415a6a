use std::error::Error as _;
use std::sync::Arc;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::path::ErrorKind as PathErrorKind,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use validator::ValidationErrors;

use crate::application::user_service::ServiceError;
use crate::data::driver_error::DriverError;
use crate::domain::error::ApplicationError;
use crate::infrastructure::cache::CacheError;

/// Every error a request can raise. Handlers and middlewares return it and
/// the error responder turns it into the client-facing JSON.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("invalid value for field \"{field}\": {value}")]
    InvalidValue { field: String, value: String },

    #[error("malformed request body: {0}")]
    MalformedBody(#[from] JsonRejection),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub(crate) type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Declared kind of the error, shown to developers only.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            AppError::Application(_) => "ApplicationError",
            AppError::Driver(err) => err.kind.name(),
            AppError::Validation(_) => "ValidationError",
            AppError::InvalidValue { .. } => "CastError",
            AppError::MalformedBody(rejection)
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE =>
            {
                "PayloadTooLargeError"
            }
            AppError::MalformedBody(_) => "SyntaxError",
            AppError::Session(_) => "SessionError",
            AppError::Cache(_) => "CacheError",
            AppError::Internal(_) => "InternalError",
        }
    }

    /// Display of the error followed by its source chain, one cause per line.
    pub(crate) fn trace(&self) -> String {
        let mut trace = format!("{}: {self}", self.name());
        if let AppError::Driver(DriverError {
            code: Some(code), ..
        }) = self
        {
            trace.push_str(&format!(" (sqlstate {code})"));
        }
        let mut source = self.source();
        while let Some(cause) = source {
            trace.push_str("\n    caused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }
        trace
    }
}

/// Response extension carrying the raised error to the error responder.
#[derive(Debug, Clone)]
pub(crate) struct RaisedError(pub(crate) Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response
            .extensions_mut()
            .insert(RaisedError(Arc::new(self)));
        response
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Application(err) => AppError::Application(err),
            ServiceError::Driver(err) => AppError::Driver(err),
            ServiceError::Cache(err) => AppError::Cache(err),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        let PathRejection::FailedToDeserializePathParams(err) = &rejection else {
            return AppError::Internal(anyhow::anyhow!(rejection.body_text()));
        };

        match err.kind() {
            PathErrorKind::ParseErrorAtKey { key, value, .. } => AppError::InvalidValue {
                field: key.clone(),
                value: value.clone(),
            },
            PathErrorKind::ParseErrorAtIndex { index, value, .. } => AppError::InvalidValue {
                field: index.to_string(),
                value: value.clone(),
            },
            PathErrorKind::ParseError { value, .. } => AppError::InvalidValue {
                field: "path".to_string(),
                value: value.clone(),
            },
            _ => AppError::Internal(anyhow::anyhow!(rejection.body_text())),
        }
    }
}
