//! Gives error responses produced outside the handlers (timeouts, rate
//! limiting, unmatched routes) the same JSON envelope as `AppError`.

use axum::extract::Request;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::utils::response::error;

pub async fn envelope_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();

    if !(status.is_client_error() || status.is_server_error()) || is_json(response.headers()) {
        return response;
    }

    let (code, message) = describe(status);
    debug!(status = status.as_u16(), code, "Wrapping bare error response");

    let (parts, _body) = response.into_parts();
    let mut enveloped = error(code, message, None, status);
    for (name, value) in &parts.headers {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            enveloped.headers_mut().append(name.clone(), value.clone());
        }
    }
    enveloped
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

fn describe(status: StatusCode) -> (&'static str, &'static str) {
    match status {
        StatusCode::REQUEST_TIMEOUT => ("REQUEST_TIMEOUT", "Request timed out"),
        StatusCode::TOO_MANY_REQUESTS => ("RATE_LIMITED", "Too many requests, try again later"),
        StatusCode::NOT_FOUND => ("NOT_FOUND", "Route not found"),
        StatusCode::METHOD_NOT_ALLOWED => ("METHOD_NOT_ALLOWED", "Method not allowed"),
        StatusCode::PAYLOAD_TOO_LARGE => ("PAYLOAD_TOO_LARGE", "Request body is too large"),
        s if s.is_server_error() => ("INTERNAL_SERVER_ERROR", "An internal error occurred"),
        _ => ("BAD_REQUEST", "The request could not be processed"),
    }
}
