use crate::app::sanity_service::NextSanity;
use crate::domain::preview_gate::PreviewGate;
use crate::domain::preview_mode::PreviewMode;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

/// Long-lived, read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub sanity: Arc<NextSanity>,
    pub gate: Arc<PreviewGate>,
    pub preview_mode: Arc<PreviewMode>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: JsonValue) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Body of the gate's 401.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PreviewQuery {
    /// Must equal the configured preview secret.
    pub secret: Option<String>,
    /// Path to open in preview mode, without the leading slash.
    pub slug: Option<String>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExitPreviewQuery {
    /// Same-origin path to return to (default `/`).
    pub redirect: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct StaticPropsRequest {
    /// GROQ query, passed through untouched.
    pub query: String,
    /// Route params bound to `$name` placeholders.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub params: Option<Map<String, JsonValue>>,
    /// Partial result: `props` plus sibling directives like `revalidate`.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub base: Option<crate::domain::props::StaticProps>,
    /// Use the token-carrying client outside preview mode.
    #[serde(default)]
    pub authenticated: bool,
}

pub fn json_422(err: JsonRejection, expected: &str) -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse::failure(format!(
            "Invalid JSON body: {} (expected: {})",
            err, expected
        ))),
    )
}
