use crate::domain::preview_gate::{PreviewRequest, PreviewResponse};
use crate::domain::preview_mode::PreviewMode;
use crate::transport::http::handlers::common::{is_local_path, temporary_redirect};
use crate::transport::http::types::{ApiResponse, AppState, ExitPreviewQuery, PreviewQuery};
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Collects what the gate writes and renders it as an HTTP response.
///
/// Preview data becomes the signed preview cookies.
pub struct CookieResponse<'a> {
    mode: &'a PreviewMode,
    cookies: Vec<String>,
    location: Option<String>,
    json: Option<(StatusCode, JsonValue)>,
    failure: Option<String>,
}

impl<'a> CookieResponse<'a> {
    pub fn new(mode: &'a PreviewMode) -> Self {
        Self {
            mode,
            cookies: Vec::new(),
            location: None,
            json: None,
            failure: None,
        }
    }
}

impl PreviewResponse for CookieResponse<'_> {
    fn set_preview_data(&mut self, payload: JsonValue) {
        match self.mode.enable_cookies(&payload) {
            Ok(cookies) => self.cookies = cookies,
            Err(e) => self.failure = Some(format!("could not encode preview data: {}", e)),
        }
    }

    fn redirect(&mut self, location: &str) {
        self.location = Some(location.to_string());
    }

    fn json(&mut self, status: u16, body: JsonValue) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.json = Some((status, body));
    }
}

fn with_cookies(mut response: Response, cookies: &[String]) -> Response {
    if !response.status().is_redirection() {
        return response;
    }
    for cookie in cookies {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => {
                tracing::error!(error = %e, "preview cookie is not a valid header value");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::failure("could not set preview cookies")),
                )
                    .into_response();
            }
        }
    }
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

impl IntoResponse for CookieResponse<'_> {
    fn into_response(self) -> Response {
        if let Some(failure) = self.failure {
            tracing::error!(error = %failure, "preview gate failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failure(failure)),
            )
                .into_response();
        }
        if let Some((status, body)) = self.json {
            return (status, Json(body)).into_response();
        }
        match self.location {
            Some(location) => with_cookies(temporary_redirect(&location), &self.cookies),
            None => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/preview",
    params(PreviewQuery),
    responses(
        (status = 307, description = "Preview mode enabled; redirects to the slug"),
        (status = 401, description = "Secret does not match", body = crate::transport::http::types::MessageResponse)
    )
)]
pub async fn preview_handler(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let request = PreviewRequest::new(query);
    let mut response = CookieResponse::new(&state.preview_mode);
    state.gate.handle(&request, &mut response);
    response.into_response()
}

#[utoipa::path(
    get,
    path = "/api/exit-preview",
    params(ExitPreviewQuery),
    responses(
        (status = 307, description = "Preview cookies cleared")
    )
)]
pub async fn exit_preview_handler(
    State(state): State<AppState>,
    Query(query): Query<ExitPreviewQuery>,
) -> Response {
    let location = query
        .redirect
        .filter(|path| is_local_path(path))
        .unwrap_or_else(|| "/".to_string());
    tracing::info!(location = %location, "preview mode disabled");
    with_cookies(temporary_redirect(&location), &state.preview_mode.clear_cookies())
}
