// src/bin/api_server.rs

use anyhow::Context;
use sanity_preview_bridge::transport;
use sanity_preview_bridge::{ClientConfig, NextSanity, PreviewGate, PreviewMode, ServerConfig};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // --- Configuration ---
    let client_config = ClientConfig::from_env().context("invalid content API configuration")?;
    let server_config = ServerConfig::from_env().context("invalid server configuration")?;

    // --- Content clients (built once, shared by every request) ---
    let sanity = NextSanity::setup(client_config).context("could not set up content clients")?;
    if !sanity.has_preview() {
        tracing::warn!("SANITY_API_TOKEN is not set; preview requests will fail");
    }

    let mut preview_mode = PreviewMode::new(server_config.preview_secret.clone())
        .with_secure_cookies(server_config.secure_cookies);
    if let Some(max_age) = server_config.preview_max_age {
        preview_mode = preview_mode.with_max_age(max_age);
    }

    let app_state = transport::http::AppState {
        sanity: Arc::new(sanity),
        gate: Arc::new(PreviewGate::new(server_config.preview_secret.clone())),
        preview_mode: Arc::new(preview_mode),
    };

    // --- API Server ---
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);
    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr)
        .await
        .with_context(|| format!("could not bind {}", server_config.bind_addr))?;
    tracing::info!(addr = %server_config.bind_addr, "API server listening");
    tracing::info!("Swagger UI available at /swagger-ui");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
