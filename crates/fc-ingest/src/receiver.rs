//! Multicast datagram receiver.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use fc_core::config::IngestConfig;

use crate::reassembler::Reassembler;

/// Bind the ingest port and join the configured multicast group.
///
/// The socket is bound to the wildcard address so datagrams addressed to the
/// group are delivered regardless of interface.
pub fn bind_multicast(config: &IngestConfig) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    if let Err(e) = socket.set_recv_buffer_size(config.recv_buffer_size) {
        tracing::warn!(
            requested = config.recv_buffer_size,
            "Failed to set receive buffer size: {e}"
        );
    }

    let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port));
    socket.bind(&bind_addr.into())?;
    socket.join_multicast_v4(&config.group, &config.interface)?;
    socket.set_nonblocking(true)?;

    tracing::info!(
        group = %config.group,
        port = config.port,
        interface = %config.interface,
        "Joined multicast group"
    );

    UdpSocket::from_std(socket.into())
}

/// Read datagrams from `socket` and feed them to the reassembler until
/// cancelled.
///
/// Receive errors are logged and reading continues.
pub async fn run_receiver(
    socket: UdpSocket,
    reassembler: Arc<Reassembler>,
    max_datagram_size: usize,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; max_datagram_size];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Receiver shutting down");
                break;
            }
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, source)) => {
                        reassembler.handle_datagram(source.ip(), &buf[..len]);
                    }
                    Err(e) => {
                        tracing::warn!("Receive failed: {e}");
                    }
                }
            }
        }
    }
}
