//! Storage errors normalized into a driver-independent shape.
//!
//! Repositories convert every `sqlx::Error` into a [`DriverError`] so the
//! HTTP layer can classify failures without knowing about Postgres.

use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DriverErrorKind {
    NotFound,
    /// One message per offending field.
    Validation(Vec<String>),
    Cast {
        field: String,
        value: String,
    },
    DuplicateKey(Vec<String>),
    ForeignKey,
    Timeout,
    AuthFailed,
    SchemaMissing,
    Syntax,
    Connection,
    Other,
}

impl DriverErrorKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            DriverErrorKind::NotFound => "NotFoundError",
            DriverErrorKind::Validation(_) => "ValidationError",
            DriverErrorKind::Cast { .. } => "CastError",
            DriverErrorKind::DuplicateKey(_) => "DuplicateKeyError",
            DriverErrorKind::ForeignKey => "ForeignKeyViolationError",
            DriverErrorKind::Timeout => "TimeoutError",
            DriverErrorKind::AuthFailed => "AuthenticationError",
            DriverErrorKind::SchemaMissing => "SchemaError",
            DriverErrorKind::Syntax => "QuerySyntaxError",
            DriverErrorKind::Connection => "ConnectionError",
            DriverErrorKind::Other => "DriverError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub(crate) struct DriverError {
    pub(crate) kind: DriverErrorKind,
    /// SQLSTATE when the database reported one.
    pub(crate) code: Option<String>,
    pub(crate) detail: String,
}

impl DriverError {
    pub(crate) fn new(kind: DriverErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            detail: detail.into(),
        }
    }

    pub(crate) fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        let detail = err.to_string();
        match &err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|code| code.into_owned());
                let pg = db_err.try_downcast_ref::<PgDatabaseError>();
                let kind = kind_from_sqlstate(
                    code.as_deref().unwrap_or_default(),
                    db_err.message(),
                    db_err.constraint(),
                    pg,
                );
                let err = Self::new(kind, detail);
                match code {
                    Some(code) => err.with_code(code),
                    None => err,
                }
            }
            sqlx::Error::RowNotFound => Self::new(DriverErrorKind::NotFound, detail),
            sqlx::Error::PoolTimedOut => Self::new(DriverErrorKind::Timeout, detail),
            sqlx::Error::ColumnNotFound(_) | sqlx::Error::TypeNotFound { .. } => {
                Self::new(DriverErrorKind::SchemaMissing, detail)
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => Self::new(DriverErrorKind::Connection, detail),
            _ => Self::new(DriverErrorKind::Other, detail),
        }
    }
}

fn kind_from_sqlstate(
    code: &str,
    message: &str,
    constraint: Option<&str>,
    pg: Option<&PgDatabaseError>,
) -> DriverErrorKind {
    let column = pg.and_then(PgDatabaseError::column);
    match code {
        "23505" => {
            let keys = pg
                .and_then(PgDatabaseError::detail)
                .and_then(keys_from_detail)
                .or_else(|| constraint.map(keys_from_constraint))
                .unwrap_or_default();
            DriverErrorKind::DuplicateKey(keys)
        }
        "23503" => DriverErrorKind::ForeignKey,
        "23502" => DriverErrorKind::Validation(vec![format!(
            "{} is required",
            column.unwrap_or("value")
        )]),
        "23514" => DriverErrorKind::Validation(vec![format!(
            "{} check failed",
            constraint.unwrap_or("constraint")
        )]),
        "22001" => DriverErrorKind::Validation(vec![format!(
            "{} is too long",
            column.unwrap_or("value")
        )]),
        "22P02" | "22003" | "22007" | "22008" => DriverErrorKind::Cast {
            field: column.unwrap_or("value").to_string(),
            value: quoted_value(message).unwrap_or(message).to_string(),
        },
        "57014" => DriverErrorKind::Timeout,
        "28000" | "28P01" => DriverErrorKind::AuthFailed,
        "42P01" | "42703" => DriverErrorKind::SchemaMissing,
        "42601" => DriverErrorKind::Syntax,
        code if code.starts_with("08") => DriverErrorKind::Connection,
        _ => DriverErrorKind::Other,
    }
}

/// `Key (email)=(a@b.c) already exists.` -> `["email"]`
fn keys_from_detail(detail: &str) -> Option<Vec<String>> {
    let start = detail.find("Key (")? + "Key (".len();
    let end = start + detail[start..].find(")=")?;
    let keys = detail[start..end]
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    (!keys.is_empty()).then_some(keys)
}

/// `users_email_key` -> `["email"]`
fn keys_from_constraint(constraint: &str) -> Vec<String> {
    let trimmed = constraint.strip_suffix("_key").unwrap_or(constraint);
    let key = trimmed
        .split_once('_')
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    vec![key.to_string()]
}

/// `invalid input syntax for type bigint: "abc"` -> `abc`
fn quoted_value(message: &str) -> Option<&str> {
    let start = message.find('"')? + 1;
    let end = start + message[start..].find('"')?;
    Some(&message[start..end])
}
