use async_trait::async_trait;

use crate::data::driver_error::DriverError;
use crate::domain::user::User;

#[derive(Debug, Clone)]
pub(crate) struct UserCredentials {
    pub(crate) user: User,
    pub(crate) password_hash: String,
}

#[derive(Debug, Clone)]
pub(crate) struct NewUser {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) country: String,
    pub(crate) city: Option<String>,
    pub(crate) phone: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) password_hash: String,
}

#[async_trait]
pub(crate) trait UserRepository: Send + Sync {
    async fn create_user(&self, input: NewUser) -> Result<User, DriverError>;
    /// Fails with a `NotFound` driver error when the id is unknown.
    async fn get_by_id(&self, id: i64) -> Result<User, DriverError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, DriverError>;
}
