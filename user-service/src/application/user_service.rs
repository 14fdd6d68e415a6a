use std::sync::{Arc, LazyLock};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::data::driver_error::DriverError;
use crate::data::user_repository::{NewUser, UserRepository};
use crate::domain::error::ApplicationError;
use crate::domain::user::{LoginRequest, RegisterRequest, User, normalize_email};
use crate::infrastructure::cache::{Cache, CacheError};
use crate::infrastructure::password::{self, PasswordError};

#[derive(Debug, Error)]
pub(crate) enum ServiceError {
    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

static DUMMY_PASSWORD_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| password::hash_password("dummy-password-for-timing").ok());

pub(crate) struct UserService {
    repo: Arc<dyn UserRepository>,
    cache: Option<Cache>,
    cache_ttl: Duration,
}

impl UserService {
    pub(crate) fn new(repo: Arc<dyn UserRepository>, cache: Option<Cache>, cache_ttl: Duration) -> Self {
        Self {
            repo,
            cache,
            cache_ttl,
        }
    }

    pub(crate) async fn register(&self, req: RegisterRequest) -> Result<User, ServiceError> {
        let req = req.normalize();
        let password_hash = password::hash_password(&req.password).map_err(credentials_error)?;

        let user = self
            .repo
            .create_user(NewUser {
                username: req.username,
                email: req.email,
                country: req.country,
                city: req.city,
                phone: req.phone,
                avatar_url: req.avatar_url,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    pub(crate) async fn login(&self, req: LoginRequest) -> Result<User, ServiceError> {
        let email = normalize_email(&req.email);

        let Some(creds) = self.repo.find_by_email(&email).await? else {
            // keep timing close to the found-user path
            if let Some(hash) = DUMMY_PASSWORD_HASH.as_deref() {
                let _ = password::verify_password(&req.password, hash);
            }
            return Err(invalid_credentials());
        };

        match password::verify_password(&req.password, &creds.password_hash) {
            Ok(()) => Ok(creds.user),
            Err(PasswordError::Mismatch) => Err(invalid_credentials()),
            Err(err) => Err(credentials_error(err)),
        }
    }

    pub(crate) async fn get_user(&self, id: i64) -> Result<User, ServiceError> {
        let fetch = || async { self.repo.get_by_id(id).await.map_err(ServiceError::from) };

        match &self.cache {
            Some(cache) => {
                cache
                    .remember(&format!("users:{id}"), self.cache_ttl, fetch)
                    .await
            }
            None => fetch().await,
        }
    }
}

fn invalid_credentials() -> ServiceError {
    ApplicationError::unauthorized("Invalid email or password").into()
}

fn credentials_error(err: PasswordError) -> ServiceError {
    tracing::error!(error = %err, "password processing failed");
    ApplicationError::new("Unable to process credentials")
        .non_operational()
        .into()
}
