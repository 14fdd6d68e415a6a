pub mod cache;
pub mod database;
pub mod logging;
pub(crate) mod password;
pub mod session_store;
pub mod settings;
