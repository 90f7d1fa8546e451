//! Frame delivery routes: continuous MJPEG and single-JPEG snapshots.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use fc_ingest::stream::{content_type, encode_part};

use crate::context::AppContext;
use crate::error::AppError;

/// GET /src/{ip}/frame.mjpg
///
/// Streams every undamaged frame completed after the request arrives as a
/// `multipart/x-mixed-replace` body. The response ends when the client goes
/// away (the body stream, and with it the reader's chain position, is
/// dropped), when a configured frame timeout expires, or on shutdown.
pub async fn mjpeg(
    State(ctx): State<AppContext>,
    Path(ip): Path<String>,
) -> Result<Response, AppError> {
    let id = ctx.resolve_device(&ip)?;
    let mut cursor = ctx.registry.open_stream(id, &ctx.config.stream)?;
    let boundary = ctx.config.stream.boundary.clone();
    let shutdown = ctx.shutdown.clone();

    tracing::info!(device = %id, position = cursor.position(), "MJPEG stream opened");

    let parts = async_stream::stream! {
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = cursor.next_frame() => next,
            };
            match next {
                Ok(frame) => yield Ok::<_, Infallible>(encode_part(&boundary, &frame)),
                Err(e) => {
                    tracing::info!(device = %id, "MJPEG stream ended: {e}");
                    break;
                }
            }
        }
    };

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type(&ctx.config.stream.boundary))],
        [(header::CACHE_CONTROL, "no-cache")],
        Body::from_stream(parts),
    )
        .into_response())
}

/// GET /src/{ip}/frame.jpeg
///
/// Waits for the device's next undamaged frame and returns it.
pub async fn jpeg(
    State(ctx): State<AppContext>,
    Path(ip): Path<String>,
) -> Result<Response, AppError> {
    let id = ctx.resolve_device(&ip)?;
    let frame = tokio::select! {
        _ = ctx.shutdown.cancelled() => {
            return Err(fc_core::Error::Unavailable("Server shutting down".into()).into());
        }
        frame = ctx.registry.snapshot_frame(id, &ctx.config.stream) => frame?,
    };

    tracing::debug!(device = %id, seq = frame.seq, len = frame.payload.len(), "Serving snapshot");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        frame.payload,
    )
        .into_response())
}
