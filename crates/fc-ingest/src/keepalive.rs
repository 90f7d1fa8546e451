//! Sender keepalive responder.
//!
//! Extenders periodically probe the receiver on a control port and stop
//! transmitting if nobody answers. Every probe is answered with a fixed
//! control blob sent back to the prober's address.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use fc_core::config::ControlBlob;

/// Control blob understood by first-generation extenders.
pub const CONTROL_V1: [u8; 23] = [
    0x54, 0x46, 0x36, 0x7a, 0x60, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x03, 0x01, 0x00, 0x26,
    0x00, 0x00, 0x00, 0x00, 0x02, 0x34, 0xc2,
];

/// Control blob understood by second-generation extenders.
pub const CONTROL_V2: [u8; 23] = [
    0x54, 0x46, 0x36, 0x7a, 0x60, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x03, 0x01, 0x00, 0x26,
    0x00, 0x00, 0x00, 0x00, 0x0d, 0x2f, 0xd8,
];

const PROBE_BUFFER_SIZE: usize = 1024;

pub fn control_blob(blob: ControlBlob) -> &'static [u8] {
    match blob {
        ControlBlob::V1 => &CONTROL_V1,
        ControlBlob::V2 => &CONTROL_V2,
    }
}

/// Bind the keepalive control port on all interfaces.
pub async fn bind_keepalive(port: u16) -> io::Result<UdpSocket> {
    let socket =
        UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))).await?;
    tracing::info!(port, "Keepalive responder listening");
    Ok(socket)
}

/// Answer keepalive probes until cancelled.
pub async fn run_keepalive(socket: UdpSocket, blob: &'static [u8], cancel: CancellationToken) {
    let mut buf = [0u8; PROBE_BUFFER_SIZE];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Keepalive responder shutting down");
                break;
            }
            result = socket.recv_from(&mut buf) => {
                let peer = match result {
                    Ok((_, peer)) => peer,
                    Err(e) => {
                        tracing::warn!("Keepalive receive failed: {e}");
                        continue;
                    }
                };
                tracing::debug!(peer = %peer, "Keepalive probe");
                if let Err(e) = socket.send_to(blob, peer).await {
                    tracing::warn!(peer = %peer, "Keepalive reply failed: {e}");
                }
            }
        }
    }
}
