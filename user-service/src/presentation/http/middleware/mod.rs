pub(crate) mod cors;
pub(crate) mod error_responder;
pub(crate) mod rate_limit;
pub(crate) mod security_headers;
pub(crate) mod session;
pub(crate) mod timeout;
pub(crate) mod trace;
