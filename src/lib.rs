pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod submission;
pub mod utils;

use crate::api::handlers::forge::FORGE_TRANSFORMER_PATH;
use crate::config::ForgeConfig;
use crate::services::manager::ManagerService;
use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, Response, header},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::forge::create_upload_url,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::UploadUrlRequest,
            models::UploadUrlResponse,
            models::ErrorBody,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "forge", description = "Dataset upload sessions"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    /// `None` when MANAGER_SERVICE_URL is unset; upload requests then get 503.
    pub manager: Option<Arc<dyn ManagerService>>,
    pub config: ForgeConfig,
}

pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    // Runs inside the request-id layer, so every span has the final id.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(api::middleware::request_id::REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
            info!(
                "📤 Finished in {:?} with status {}",
                latency,
                response.status()
            );
        });

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            FORGE_TRANSFORMER_PATH,
            post(api::handlers::forge::create_upload_url),
        )
        .layer(trace_layer)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .expose_headers([header::HeaderName::from_static(
                    api::middleware::request_id::REQUEST_ID_HEADER,
                )]),
        )
        .with_state(state)
}
