use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use utoipa::ToSchema;
use tracing::warn;
use validator::{Validate, ValidationErrors};

use crate::domain::error::ApplicationError;
use crate::domain::user::{LoginRequest, RegisterRequest, User};
use crate::presentation::AppState;
use crate::presentation::http::app_error::AppResult;
use crate::presentation::http::extract::{AppJson, AppPath};

pub(crate) const SESSION_USER_ID: &str = "auth:user";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct RegisterDto {
    #[validate(length(min = 3, max = 64, message = "username must be 3..64 chars"))]
    pub(crate) username: String,
    #[validate(email(message = "email must be a valid email"))]
    pub(crate) email: String,
    #[validate(length(min = 2, max = 64, message = "country must be 2..64 chars"))]
    pub(crate) country: String,
    #[validate(length(max = 64, message = "city must be at most 64 chars"))]
    pub(crate) city: Option<String>,
    #[validate(length(min = 7, max = 20, message = "phone must be 7..20 chars"))]
    pub(crate) phone: String,
    #[validate(url(message = "avatar_url must be a valid url"))]
    pub(crate) avatar_url: Option<String>,
    #[validate(length(min = 8, max = 128, message = "password must be 8..128 chars"))]
    pub(crate) password: String,
}

impl RegisterDto {
    /// Normalizes the fields the way they are stored, then validates them.
    fn into_request(self) -> Result<RegisterRequest, ValidationErrors> {
        let normalized = RegisterRequest::from(self).normalize();
        let dto = Self::from(normalized);
        dto.validate()?;
        Ok(dto.into())
    }
}

impl From<RegisterDto> for RegisterRequest {
    fn from(dto: RegisterDto) -> Self {
        Self {
            username: dto.username,
            email: dto.email,
            country: dto.country,
            city: dto.city,
            phone: dto.phone,
            avatar_url: dto.avatar_url,
            password: dto.password,
        }
    }
}

impl From<RegisterRequest> for RegisterDto {
    fn from(req: RegisterRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            country: req.country,
            city: req.city,
            phone: req.phone,
            avatar_url: req.avatar_url,
            password: req.password,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct LoginDto {
    #[validate(email(message = "email must be a valid email"))]
    pub(crate) email: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct UserDto {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) country: String,
    pub(crate) city: Option<String>,
    pub(crate) phone: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) is_admin: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            country: user.country,
            city: user.city,
            phone: user.phone,
            avatar_url: user.avatar_url,
            is_admin: user.is_admin,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = RegisterDto,
    responses(
        (status = 201, description = "User registered, signed in when the session store is up", body = UserDto),
        (status = 400, description = "Malformed JSON payload"),
        (status = 413, description = "Request body too large"),
        (status = 409, description = "Username, email or phone already taken"),
        (status = 422, description = "Validation error"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    session: Session,
    AppJson(dto): AppJson<RegisterDto>,
) -> AppResult<(StatusCode, Json<UserDto>)> {
    let user = state.users.register(dto.into_request()?).await?;

    // the row is committed, sign-in is best effort
    if let Err(err) = sign_in(&session, user.id).await {
        warn!(user_id = user.id, error = %err, "registered user could not be signed in");
    }

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "users",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Signed in", body = UserDto),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Validation error")
    )
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    session: Session,
    AppJson(dto): AppJson<LoginDto>,
) -> AppResult<Json<UserDto>> {
    dto.validate()?;

    let user = state
        .users
        .login(LoginRequest {
            email: dto.email,
            password: dto.password,
        })
        .await?;

    sign_in(&session, user.id).await?;

    Ok(Json(user.into()))
}

#[utoipa::path(
    post,
    path = "/api/users/logout",
    tag = "users",
    responses((status = 204, description = "Session cleared"))
)]
pub(crate) async fn logout(session: Session) -> AppResult<StatusCode> {
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Signed-in user", body = UserDto),
        (status = 401, description = "Not signed in")
    )
)]
pub(crate) async fn me(State(state): State<AppState>, session: Session) -> AppResult<Json<UserDto>> {
    let user_id = session
        .get::<i64>(SESSION_USER_ID)
        .await?
        .ok_or_else(|| ApplicationError::unauthorized("You are not signed in"))?;

    let user = state.users.get_user(user_id).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserDto),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "User not found")
    )
)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<UserDto>> {
    let user = state.users.get_user(id).await?;
    Ok(Json(user.into()))
}

/// Rotates the session id and persists the user id right away, so store
/// failures surface here instead of in the session layer.
async fn sign_in(session: &Session, user_id: i64) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_ID, user_id).await?;
    if let Err(err) = session.save().await {
        // leave nothing for the session layer to write
        session.clear().await;
        return Err(err.into());
    }
    Ok(())
}
