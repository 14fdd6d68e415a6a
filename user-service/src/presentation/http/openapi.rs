use utoipa::OpenApi;

use crate::presentation::http::handlers::health::HealthResponse;
use crate::presentation::http::handlers::users::{LoginDto, RegisterDto, UserDto};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::http::handlers::health::health,
        crate::presentation::http::handlers::users::register,
        crate::presentation::http::handlers::users::login,
        crate::presentation::http::handlers::users::logout,
        crate::presentation::http::handlers::users::me,
        crate::presentation::http::handlers::users::get_user
    ),
    components(schemas(HealthResponse, RegisterDto, LoginDto, UserDto)),
    tags(
        (name = "health", description = "Liveness and database state"),
        (name = "users", description = "User registration and sessions")
    )
)]
pub(crate) struct ApiDoc;
