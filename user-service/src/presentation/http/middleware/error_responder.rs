use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::presentation::AppState;
use crate::presentation::http::app_error::RaisedError;

/// Terminal error handler: any response carrying a raised error is replaced
/// by its classified JSON rendition.
pub(crate) async fn error_responder(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    let mut response = next.run(request).await;
    match response.extensions_mut().remove::<RaisedError>() {
        Some(RaisedError(err)) => state.responder.respond(&err, &path, &method),
        None => response,
    }
}
