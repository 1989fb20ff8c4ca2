use crate::error::{FetchError, SanityError};
use crate::transport::http::types::ApiResponse;
use axum::http::header::{COOKIE, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

/// All `Cookie` headers joined into one (HTTP/2 may split them).
pub fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

/// Only same-origin absolute paths are accepted as redirect targets.
///
/// Any control character fails the check, since browsers strip tabs and
/// newlines before resolving the URL.
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.starts_with("/\\")
        && !path.chars().any(|c| c.is_ascii_control())
}

/// 307 to `location`, or 400 when it cannot be sent as a header.
pub fn temporary_redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, value)]).into_response(),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failure("redirect target is not a valid header value")),
        )
            .into_response(),
    }
}

pub fn sanity_error_response(err: SanityError) -> (StatusCode, Json<ApiResponse>) {
    let status = match &err {
        SanityError::Config(e) => {
            tracing::error!(error = %e, "content client misconfigured");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        SanityError::Fetch(FetchError::Status { status, .. }) if *status == 400 => {
            StatusCode::BAD_REQUEST
        }
        SanityError::Fetch(e) => {
            tracing::error!(error = %e, "content query failed");
            StatusCode::BAD_GATEWAY
        }
    };
    (status, Json(ApiResponse::failure(err.to_string())))
}
