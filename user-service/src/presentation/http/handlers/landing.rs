use axum::response::Html;

pub(crate) const LANDING_PAGE: &str =
    r#"<h1>User Service API Documentation</h1><a href="/api-docs">Documentation</a>"#;

pub(crate) async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}
