use std::any::Any;
use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, compression::CompressionLayer};
use tracing::info;

use crate::infrastructure::session_store::AppSessionStore;
use crate::infrastructure::settings::Settings;
use crate::presentation::AppState;
use crate::presentation::http::app_error::AppError;
use crate::presentation::http::middleware::{
    cors::apply_cors, error_responder::error_responder, rate_limit::rate_limit,
    security_headers::apply_security_headers, session::apply_sessions, timeout::request_timeout,
    trace::apply_trace,
};
use crate::presentation::http::routes;

pub(crate) async fn run_http(settings: &Settings, state: AppState, store: AppSessionStore) -> Result<()> {
    let app = build_router(settings, state, store)?;

    let listener = TcpListener::bind(&settings.http_addr).await?;

    info!(mode = %settings.mode, "HTTP server listening on {}", settings.http_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

pub(crate) fn build_router(settings: &Settings, state: AppState, store: AppSessionStore) -> Result<Router> {
    let routes = routes::router(&state);
    with_middleware(routes, settings, state, store)
}

/// Layers listed innermost first; the error responder wraps everything that
/// can raise an `AppError`, body limit rejections included.
pub(crate) fn with_middleware(
    routes: Router<AppState>,
    settings: &Settings,
    state: AppState,
    store: AppSessionStore,
) -> Result<Router> {
    let router = routes
        .layer(CatchPanicLayer::custom(panic_to_error))
        .layer(middleware::from_fn_with_state(state.clone(), request_timeout))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit));
    let router = apply_sessions(router, settings, store)?
        .layer(middleware::from_fn_with_state(state.clone(), error_responder))
        .layer(DefaultBodyLimit::max(settings.http_request_body_limit_bytes))
        .with_state(state);

    let router = apply_security_headers(router).layer(CompressionLayer::new());
    let router = apply_cors(router, &settings.cors_origins)?;
    Ok(apply_trace(router, settings.mode))
}

fn panic_to_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use axum::routing::get;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::infrastructure::password::hash_password;
    use crate::infrastructure::session_store::{AppSessionStore, RedisSessionStore};
    use crate::infrastructure::settings::RunMode;
    use crate::presentation::AppState;
    use crate::testing::{sample_user, test_app, test_app_with, test_settings};

    async fn sleepy() -> &'static str {
        tokio::time::sleep(Duration::from_secs(600)).await;
        "too late"
    }

    async fn exploding() -> &'static str {
        panic!("handler blew up")
    }

    fn unreachable_session_store() -> AppSessionStore {
        let client = redis::Client::open("redis://127.0.0.1:1/").expect("valid url");
        AppSessionStore::Redis(RedisSessionStore::new(client, "sessions:"))
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, header::HeaderMap, Value) {
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body must be readable")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request")
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request")
    }

    fn registration(email: &str) -> String {
        json!({
            "username": "valid_user",
            "email": email,
            "country": "NG",
            "phone": "+2348000000000",
            "password": "very-secure-password"
        })
        .to_string()
    }

    #[tokio::test]
    async fn health_reports_database_state() {
        let app = test_app(&test_settings(RunMode::Test));

        let (status, headers, body) = send(&app.router, get_request("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["db"], "disconnected");
        assert!(body["uptime"].as_f64().is_some());
        assert!(body["timestamp"].as_str().is_some_and(|ts| ts.ends_with('Z')));
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(app.db.state().as_str(), "disconnected");
    }

    #[tokio::test]
    async fn unknown_route_is_a_logged_404() {
        let app = test_app(&test_settings(RunMode::Test));

        let (status, headers, body) = send(&app.router, get_request("/nope")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({"status": "fail", "message": "Can't find GET /nope on this server"})
        );
        assert_eq!(headers["x-download-options"], "noopen");

        let entries = app.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, "warn");
        assert_eq!(entries[0].status_code, 404);
        assert_eq!(entries[0].path, "/nope");
        assert_eq!(entries[0].method, "GET");
    }

    #[tokio::test]
    async fn development_exposes_stack_and_name() {
        let app = test_app(&test_settings(RunMode::Development));

        let (status, _, body) = send(&app.router, get_request("/nope")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errorName"], "ApplicationError");
        assert!(body["stack"].as_str().is_some());
    }

    #[tokio::test]
    async fn landing_page_only_outside_production() {
        let app = test_app(&test_settings(RunMode::Test));
        let response = app
            .router
            .clone()
            .oneshot(get_request("/"))
            .await
            .expect("router is infallible");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body must be readable")
            .to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("/api-docs"));

        let prod = test_app(&test_settings(RunMode::Production));
        let (status, _, body) = send(&prod.router, get_request("/")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.get("stack").is_none());
        let (status, _, _) = send(&prod.router, get_request("/api-docs/openapi.json")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_json_is_a_400() {
        let app = test_app(&test_settings(RunMode::Test));

        let (status, _, body) = send(&app.router, post_json("/api/users", "{\"email\":")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Invalid JSON payload");
    }

    #[tokio::test]
    async fn validation_failures_are_422() {
        let app = test_app(&test_settings(RunMode::Test));

        let (status, _, body) =
            send(&app.router, post_json("/api/users", &registration("not-an-email"))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "email must be a valid email");
    }

    #[tokio::test]
    async fn invalid_path_id_is_a_400() {
        let app = test_app(&test_settings(RunMode::Test));

        let (status, _, body) = send(&app.router, get_request("/api/users/abc")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().is_some_and(|m| m.contains("abc")));
    }

    #[tokio::test]
    async fn unknown_user_is_a_404() {
        let app = test_app(&test_settings(RunMode::Test));

        let (status, _, body) = send(&app.router, get_request("/api/users/42")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Resource not found");
    }

    #[tokio::test]
    async fn register_signs_in_and_rejects_duplicates() {
        let app = test_app(&test_settings(RunMode::Test));

        let (status, headers, body) =
            send(&app.router, post_json("/api/users", &registration("a@example.com"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "a@example.com");
        assert!(body.get("password_hash").is_none());

        let cookie = headers
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .expect("session cookie must be set")
            .to_string();
        assert!(cookie.starts_with("sid="));

        let me = Request::builder()
            .uri("/api/users/me")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .expect("valid request");
        let (status, _, body) = send(&app.router, me).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);

        let (status, _, body) =
            send(&app.router, post_json("/api/users", &registration("a@example.com"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Duplicate entry: \"email\" already exists");
        assert_eq!(app.repo.take_last_created().map(|u| u.email), Some("a@example.com".to_string()));
    }

    #[tokio::test]
    async fn me_requires_a_session() {
        let app = test_app(&test_settings(RunMode::Test));

        let (status, _, body) = send(&app.router, get_request("/api/users/me")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "You are not signed in");
    }

    #[tokio::test]
    async fn wrong_credentials_are_401() {
        let app = test_app(&test_settings(RunMode::Test));
        let login = json!({"email": "ghost@example.com", "password": "whatever"}).to_string();

        let (status, _, body) = send(&app.router, post_json("/api/users/login", &login)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn rate_limit_answers_429() {
        let mut settings = test_settings(RunMode::Test);
        settings.rate_limit_max_requests = 2;
        let app = test_app(&settings);

        for _ in 0..2 {
            let (status, _, _) = send(&app.router, get_request("/health")).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, _, body) = send(&app.router, get_request("/health")).await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["message"], "Too many requests, please try again later.");
    }

    #[test]
    fn panic_payload_becomes_internal_error() {
        let response = super::panic_to_error(Box::new("boom"));
        assert!(
            response
                .extensions()
                .get::<crate::presentation::http::app_error::RaisedError>()
                .is_some()
        );
    }

    #[tokio::test]
    async fn unrouted_method_on_known_path_is_a_logged_404() {
        let app = test_app(&test_settings(RunMode::Test));
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/health")
            .body(Body::empty())
            .expect("valid request");

        let (status, _, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({"status": "fail", "message": "Can't find DELETE /health on this server"})
        );
        let entries = app.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].method, "DELETE");

        let (status, _, body) = send(&app.router, post_json("/api/users/me", "{}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Can't find POST /api/users/me on this server");
    }

    #[tokio::test]
    async fn oversized_body_is_a_classified_413() {
        let mut settings = test_settings(RunMode::Test);
        settings.http_request_body_limit_bytes = 16;
        let app = test_app(&settings);

        let (status, _, body) =
            send(&app.router, post_json("/api/users", &registration("a@example.com"))).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body,
            json!({"status": "fail", "message": "Request body is too large"})
        );
        let entries = app.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status_code, 413);
        assert!(app.repo.take_last_created().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out_with_408() {
        let app = test_app_with(
            &test_settings(RunMode::Test),
            Router::<AppState>::new().route("/slow", get(sleepy)),
            AppSessionStore::Memory(tower_sessions::MemoryStore::default()),
        );

        let (status, _, body) = send(&app.router, get_request("/slow")).await;

        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["message"], "Request timed out");
        assert_eq!(app.log.entries().len(), 1);
    }

    #[tokio::test]
    async fn handler_panic_is_a_classified_500() {
        let app = test_app_with(
            &test_settings(RunMode::Test),
            Router::<AppState>::new().route("/explode", get(exploding)),
            AppSessionStore::Memory(tower_sessions::MemoryStore::default()),
        );

        let (status, headers, body) = send(&app.router, get_request("/explode")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"status": "error", "message": "Internal server error"})
        );
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");

        let entries = app.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, "error");
        assert!(
            entries[0]
                .error
                .as_deref()
                .is_some_and(|detail| detail.contains("handler blew up"))
        );
    }

    #[tokio::test]
    async fn registration_fields_are_validated_after_trimming() {
        let app = test_app(&test_settings(RunMode::Test));
        let mut payload: Value =
            serde_json::from_str(&registration("a@example.com")).expect("valid json");
        payload["username"] = json!("  ab ");

        let (status, _, body) =
            send(&app.router, post_json("/api/users", &payload.to_string())).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "username must be 3..64 chars");
        assert!(app.repo.take_last_created().is_none());

        payload["username"] = json!("  abc ");
        payload["email"] = json!(" Mixed@Example.COM ");
        let (status, _, body) =
            send(&app.router, post_json("/api/users", &payload.to_string())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "abc");
        assert_eq!(body["email"], "mixed@example.com");
    }

    #[tokio::test]
    async fn registration_survives_a_session_store_outage() {
        let app = test_app_with(
            &test_settings(RunMode::Test),
            Router::new(),
            unreachable_session_store(),
        );

        let (status, _, body) =
            send(&app.router, post_json("/api/users", &registration("a@example.com"))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "a@example.com");
        assert!(app.repo.take_last_created().is_some());
        assert!(app.log.entries().is_empty());
    }

    #[tokio::test]
    async fn login_during_session_store_outage_is_a_classified_500() {
        let app = test_app_with(
            &test_settings(RunMode::Test),
            Router::new(),
            unreachable_session_store(),
        );
        app.repo.insert(
            sample_user(3, "b@example.com"),
            hash_password("correct-password").expect("hash must be created"),
        );
        let login = json!({"email": "b@example.com", "password": "correct-password"}).to_string();

        let (status, _, body) = send(&app.router, post_json("/api/users/login", &login)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        let entries = app.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, "error");
    }
}
