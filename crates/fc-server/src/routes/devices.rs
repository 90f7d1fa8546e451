//! Device status endpoints.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;

use fc_ingest::DeviceSnapshot;

use crate::context::AppContext;
use crate::error::AppError;

/// GET /api/devices
#[utoipa::path(
    get,
    path = "/api/devices",
    responses(
        (status = 200, description = "All devices in registration order", body = Vec<DeviceSnapshot>)
    )
)]
pub async fn list_devices(State(ctx): State<AppContext>) -> Json<Vec<DeviceSnapshot>> {
    Json(ctx.registry.snapshots())
}

/// GET /api/devices/{ip}
#[utoipa::path(
    get,
    path = "/api/devices/{ip}",
    params(
        ("ip" = String, Path, description = "Device address, or `default` for the first device seen")
    ),
    responses(
        (status = 200, description = "Device counters and rates", body = DeviceSnapshot),
        (status = 404, description = "Device not found")
    )
)]
pub async fn get_device(
    State(ctx): State<AppContext>,
    Path(ip): Path<String>,
) -> Result<Json<DeviceSnapshot>, AppError> {
    let id = ctx.resolve_device(&ip)?;
    Ok(Json(ctx.registry.snapshot(id)?))
}

/// GET /status -- every device keyed by address.
pub async fn status(State(ctx): State<AppContext>) -> Json<BTreeMap<String, DeviceSnapshot>> {
    Json(status_map(&ctx))
}

pub(crate) fn status_map(ctx: &AppContext) -> BTreeMap<String, DeviceSnapshot> {
    ctx.registry
        .snapshots()
        .into_iter()
        .map(|snap| (snap.id.to_string(), snap))
        .collect()
}
