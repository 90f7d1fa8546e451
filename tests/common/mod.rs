//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a device registry, reassembler and
//! full [`AppContext`] together. [`TestHarness::with_server`] starts Axum on
//! a random port for HTTP-level testing, and [`TestHarness::with_receiver`]
//! additionally listens for chunk datagrams on a loopback UDP port.

#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use fc_core::config::Config;
use fc_ingest::{receiver, Chunk, DeviceRegistry, Reassembler};
use fc_server::context::AppContext;
use fc_server::router::build_router;

pub struct TestHarness {
    pub ctx: AppContext,
    pub reassembler: Arc<Reassembler>,
    pub cancel: CancellationToken,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let registry = Arc::new(DeviceRegistry::new());
        let reassembler = Arc::new(
            Reassembler::new(Arc::clone(&registry), &config.ingest)
                .with_retention(config.stream.retained_frames()),
        );
        let cancel = CancellationToken::new();
        let ctx = AppContext::new(Arc::new(config), registry).with_shutdown(cancel.clone());
        Self {
            ctx,
            reassembler,
            cancel,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Start a loopback UDP receiver feeding this harness's reassembler.
    pub async fn with_receiver(&self) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("failed to bind udp port");
        let addr = socket.local_addr().expect("failed to get udp addr");
        tokio::spawn(receiver::run_receiver(
            socket,
            Arc::clone(&self.reassembler),
            self.ctx.config.ingest.max_datagram_size,
            self.cancel.clone(),
        ));
        addr
    }

    /// Feed a datagram directly, as if it had arrived from `source`.
    pub fn inject(&self, source: &str, frame: u16, index: u16, eof: bool, payload: &[u8]) {
        let source: IpAddr = source.parse().expect("bad source address");
        self.reassembler
            .handle_datagram(source, &Chunk::encode(frame, index, eof, payload));
    }

    /// Feed a whole frame split into `chunk_size` pieces.
    pub fn inject_frame(&self, source: &str, frame: u16, jpeg: &[u8]) {
        let chunk_size = self.ctx.config.ingest.chunk_size;
        let chunks: Vec<&[u8]> = jpeg.chunks(chunk_size).collect();
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            self.inject(source, frame, i as u16, i == last, chunk);
        }
    }

    /// Poll until `cond` holds or two seconds pass.
    pub async fn wait_until(&self, mut cond: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..200 {
            if cond(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A fake JPEG of `len` bytes with SOI/EOI markers and a recognizable body.
pub fn fake_jpeg(len: usize, seed: u8) -> Vec<u8> {
    assert!(len >= 4);
    let mut jpeg = vec![0xff, 0xd8];
    jpeg.extend((0..len - 4).map(|i| (i as u8).wrapping_add(seed)));
    jpeg.extend_from_slice(&[0xff, 0xd9]);
    jpeg
}

/// Read from a streaming response until `buf` holds at least `n` bytes.
pub async fn read_at_least(resp: &mut reqwest::Response, buf: &mut Vec<u8>, n: usize) {
    while buf.len() < n {
        let chunk = tokio::time::timeout(Duration::from_secs(2), resp.chunk())
            .await
            .expect("timed out reading stream")
            .expect("stream read failed")
            .expect("stream ended early");
        buf.extend_from_slice(&chunk);
    }
}
