use thiserror::Error;

/// Intentional, user-facing failure raised by application code.
///
/// The message is shown to the client as-is, so it must never carry
/// internal detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub(crate) struct ApplicationError {
    message: String,
    status_code: u16,
    is_operational: bool,
}

impl ApplicationError {
    pub(crate) const DEFAULT_STATUS: u16 = 500;

    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: Self::DEFAULT_STATUS,
            is_operational: true,
        }
    }

    pub(crate) fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub(crate) fn non_operational(mut self) -> Self {
        self.is_operational = false;
        self
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::new(message).with_status(404)
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message).with_status(401)
    }

    pub(crate) fn too_many_requests() -> Self {
        Self::new("Too many requests, please try again later.").with_status(429)
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn status_code(&self) -> u16 {
        self.status_code
    }

    pub(crate) fn is_operational(&self) -> bool {
        self.is_operational
    }
}
