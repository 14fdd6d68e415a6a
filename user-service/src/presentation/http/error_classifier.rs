//! Classification of raised errors into client responses.
//!
//! [`classify`] holds the whole status table; the first matching rule wins.
//! [`ErrorResponder`] applies it, writes one log entry per error and renders
//! the JSON body.

use std::sync::Arc;

use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use validator::ValidationErrors;

use super::app_error::AppError;
use crate::data::driver_error::{DriverError, DriverErrorKind};
use crate::infrastructure::settings::RunMode;

pub(crate) const GENERIC_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Classification {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
    pub(crate) operational: bool,
}

impl Classification {
    fn operational(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            operational: true,
        }
    }

    fn critical(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            operational: false,
        }
    }
}

pub(crate) fn classify(err: &AppError) -> Classification {
    match err {
        AppError::Application(err) => Classification {
            status: StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: err.message().to_string(),
            operational: err.is_operational(),
        },
        AppError::Driver(err) => classify_driver(err),
        AppError::Validation(errors) => Classification::operational(
            StatusCode::UNPROCESSABLE_ENTITY,
            validation_messages(errors).join(", "),
        ),
        AppError::InvalidValue { field, value } => Classification::operational(
            StatusCode::BAD_REQUEST,
            invalid_value_message(field, value),
        ),
        AppError::MalformedBody(rejection)
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE =>
        {
            Classification::operational(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large")
        }
        AppError::MalformedBody(_) => {
            Classification::operational(StatusCode::BAD_REQUEST, "Invalid JSON payload")
        }
        AppError::Session(_) | AppError::Cache(_) | AppError::Internal(_) => {
            Classification::critical(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE)
        }
    }
}

fn classify_driver(err: &DriverError) -> Classification {
    let detail = err.detail.to_lowercase();
    match &err.kind {
        DriverErrorKind::NotFound => {
            Classification::operational(StatusCode::NOT_FOUND, "Resource not found")
        }
        DriverErrorKind::Validation(messages) => {
            Classification::operational(StatusCode::UNPROCESSABLE_ENTITY, messages.join(", "))
        }
        DriverErrorKind::Cast { field, value } => Classification::operational(
            StatusCode::BAD_REQUEST,
            invalid_value_message(field, value),
        ),
        DriverErrorKind::DuplicateKey(keys) => Classification::operational(
            StatusCode::CONFLICT,
            format!("Duplicate entry: \"{}\" already exists", keys.join(", ")),
        ),
        DriverErrorKind::ForeignKey => {
            Classification::operational(StatusCode::BAD_REQUEST, "Invalid foreign key reference")
        }
        kind if *kind == DriverErrorKind::Timeout || detail.contains("timeout") => {
            Classification::operational(StatusCode::REQUEST_TIMEOUT, "Database request timed out")
        }
        kind if *kind == DriverErrorKind::AuthFailed
            || detail.contains("authentication failed") =>
        {
            Classification::critical(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database authentication failed",
            )
        }
        DriverErrorKind::SchemaMissing => Classification::critical(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database table or column not found",
        ),
        DriverErrorKind::Syntax => {
            Classification::operational(StatusCode::BAD_REQUEST, "Invalid query syntax")
        }
        DriverErrorKind::Connection => {
            Classification::critical(StatusCode::INTERNAL_SERVER_ERROR, "Database connection error")
        }
        _ => Classification::critical(StatusCode::INTERNAL_SERVER_ERROR, "Database operation failed"),
    }
}

fn invalid_value_message(field: &str, value: &str) -> String {
    format!("Invalid value for field \"{field}\": {value}")
}

/// Field messages ordered by field name so equal errors render equally.
fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields = errors.field_errors().into_iter().collect::<Vec<_>>();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| match &error.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect()
}

/// Fields attached to every error log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogContext<'a> {
    pub(crate) status_code: u16,
    pub(crate) path: &'a str,
    pub(crate) method: &'a str,
    /// Full error, only for non-operational failures.
    pub(crate) error: Option<String>,
}

pub(crate) trait ErrorLog: Send + Sync {
    fn warn(&self, ctx: &LogContext<'_>, message: &str);
    fn error(&self, ctx: &LogContext<'_>, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingErrorLog;

impl ErrorLog for TracingErrorLog {
    fn warn(&self, ctx: &LogContext<'_>, message: &str) {
        tracing::warn!(
            status_code = ctx.status_code,
            path = ctx.path,
            method = ctx.method,
            "{message}"
        );
    }

    fn error(&self, ctx: &LogContext<'_>, message: &str) {
        tracing::error!(
            status_code = ctx.status_code,
            path = ctx.path,
            method = ctx.method,
            error = ctx.error.as_deref().unwrap_or_default(),
            "{message}"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) status: &'static str,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) stack: Option<String>,
    #[serde(rename = "errorName", skip_serializing_if = "Option::is_none")]
    pub(crate) error_name: Option<&'static str>,
}

pub(crate) struct ErrorResponder {
    log: Arc<dyn ErrorLog>,
    mode: RunMode,
}

impl ErrorResponder {
    pub(crate) fn new(log: Arc<dyn ErrorLog>, mode: RunMode) -> Self {
        Self { log, mode }
    }

    /// Classifies `err`, logs it once and builds the body sent to the client.
    pub(crate) fn render(&self, err: &AppError, path: &str, method: &Method) -> (StatusCode, ErrorBody) {
        let classification = classify(err);

        let mut ctx = LogContext {
            status_code: classification.status.as_u16(),
            path,
            method: method.as_str(),
            error: None,
        };
        if classification.operational {
            self.log.warn(
                &ctx,
                &format!("operational error: {}", classification.message),
            );
        } else {
            ctx.error = Some(format!("{err:?}"));
            self.log.error(&ctx, &format!("critical error: {err}"));
        }

        let status = if classification.status.is_server_error() {
            "error"
        } else {
            "fail"
        };
        let (stack, error_name) = if self.mode.is_development() {
            (Some(err.trace()), Some(err.name()))
        } else {
            (None, None)
        };

        (
            classification.status,
            ErrorBody {
                status,
                message: classification.message,
                stack,
                error_name,
            },
        )
    }

    pub(crate) fn respond(&self, err: &AppError, path: &str, method: &Method) -> Response {
        let (status, body) = self.render(err, path, method);
        (status, Json(body)).into_response()
    }
}
