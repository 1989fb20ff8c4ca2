use crate::transport::http::handlers::{health, preview, props};
use crate::transport::http::types::{ApiResponse, AppState, MessageResponse, StaticPropsRequest};
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        preview::preview_handler,
        preview::exit_preview_handler,
        props::static_props_handler
    ),
    components(schemas(ApiResponse, MessageResponse, StaticPropsRequest))
)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/api/preview", get(preview::preview_handler))
        .route("/api/exit-preview", get(preview::exit_preview_handler))
        .route("/api/static-props", post(props::static_props_handler))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route_and_schema() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        for route in ["/health", "/api/preview", "/api/exit-preview", "/api/static-props"] {
            assert!(doc["paths"].get(route).is_some(), "{route}");
        }
        for schema in ["ApiResponse", "MessageResponse", "StaticPropsRequest"] {
            assert!(doc["components"]["schemas"].get(schema).is_some(), "{schema}");
        }
        assert_eq!(
            doc["paths"]["/api/preview"]["get"]["responses"]["401"]["content"]["application/json"]
                ["schema"]["$ref"],
            "#/components/schemas/MessageResponse"
        );
    }
}
