//! Browser-facing HTML pages.

use std::fmt::Write as _;

use axum::extract::{Path, State};
use axum::response::Html;

use crate::context::{AppContext, DEFAULT_DEVICE};
use crate::error::AppError;
use crate::routes::devices::status_map;

/// GET / -- stream links for every device plus a status dump.
pub async fn index(State(ctx): State<AppContext>) -> Html<String> {
    let mut html = String::from("<h2>Available streams</h2>\n<ul>\n");
    let _ = writeln!(html, "<li><a href='src/{DEFAULT_DEVICE}/'>{DEFAULT_DEVICE}</a>");
    for id in ctx.registry.list() {
        let _ = writeln!(html, "<li><a href='src/{id}/'>{id}</a>");
    }
    html.push_str("</ul>\n<h2>Status</h2>\n");

    match serde_json::to_string_pretty(&status_map(&ctx)) {
        Ok(status) => {
            let _ = write!(html, "<pre>{status}</pre>");
        }
        Err(e) => tracing::warn!("Failed to render status: {e}"),
    }

    Html(html)
}

/// GET /src/{ip}/ -- a page that embeds the device's MJPEG stream.
pub async fn viewer(
    State(ctx): State<AppContext>,
    Path(ip): Path<String>,
) -> Result<Html<&'static str>, AppError> {
    ctx.resolve_device(&ip)?;
    Ok(Html("<img src='frame.mjpg'>"))
}
