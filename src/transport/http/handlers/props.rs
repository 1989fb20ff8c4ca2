use crate::app::sanity_service::StaticPropsArgs;
use crate::transport::http::handlers::common::{cookie_header, sanity_error_response};
use crate::transport::http::types::{json_422, AppState, StaticPropsRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

#[utoipa::path(
    post,
    path = "/api/static-props",
    request_body = StaticPropsRequest,
    responses(
        (status = 200, description = "Merged static props: `props` with data/preview/params plus the base directives"),
        (status = 400, description = "The content API rejected the query", body = crate::transport::http::types::ApiResponse),
        (status = 422, description = "Invalid JSON body", body = crate::transport::http::types::ApiResponse),
        (status = 502, description = "The content API failed", body = crate::transport::http::types::ApiResponse)
    )
)]
pub async fn static_props_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<StaticPropsRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(e) => return json_422(e, "{ query, params?, base?, authenticated? }").into_response(),
    };

    let mut context = state.preview_mode.context(cookie_header(&headers).as_deref());
    if let Some(params) = request.params {
        context = context.with_params(params);
    }
    let preview = context.is_preview();

    let mut args = StaticPropsArgs::new(&request.query, &context);
    args.authenticated = request.authenticated;

    match state.sanity.fetch_static_props(args, request.base).await {
        Ok(props) => {
            let mut response = (StatusCode::OK, Json(props)).into_response();
            if preview {
                response
                    .headers_mut()
                    .insert(CACHE_CONTROL, HeaderValue::from_static("private, no-store"));
            }
            response
        }
        Err(e) => sanity_error_response(e).into_response(),
    }
}
