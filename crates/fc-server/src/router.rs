//! Axum router construction.

use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::devices::list_devices,
        routes::devices::get_device,
    ),
    components(schemas(
        routes::health::HealthResponse,
        fc_ingest::DeviceSnapshot,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/devices", get(routes::devices::list_devices))
        .route("/devices/{ip}", get(routes::devices::get_device));

    let sources = Router::new()
        .route("/{ip}/", get(routes::index::viewer))
        .route("/{ip}/frame.mjpg", get(routes::stream::mjpeg))
        .route("/{ip}/frame.jpeg", get(routes::stream::jpeg));

    Router::new()
        .route("/", get(routes::index::index))
        .route("/status", get(routes::devices::status))
        .route("/health", get(routes::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", api)
        .nest("/src", sources)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
