pub(crate) mod driver_error;
pub(crate) mod repositories;
pub(crate) mod user_repository;
