pub(crate) mod health;
pub(crate) mod landing;
pub(crate) mod not_found;
pub(crate) mod users;
