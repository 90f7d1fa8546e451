//! Benchmarks for the ingest hot path.
//!
//! Measures chunk decoding and full-frame reassembly throughput at the
//! conventional 1020-byte chunk size.

use std::net::IpAddr;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use fc_core::config::IngestConfig;
use fc_ingest::{Chunk, DeviceRegistry, Reassembler};

const CHUNK_SIZE: usize = 1020;

fn datagrams(frame_len: usize) -> Vec<Vec<u8>> {
    let jpeg = vec![0x5au8; frame_len];
    let chunks: Vec<&[u8]> = jpeg.chunks(CHUNK_SIZE).collect();
    let last = chunks.len() - 1;
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| Chunk::encode(1, i as u16, i == last, c))
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let datagram = Chunk::encode(7, 3, false, &[0u8; CHUNK_SIZE]);
    let mut group = c.benchmark_group("chunk_decode");
    group.throughput(Throughput::Bytes(datagram.len() as u64));
    group.bench_function("decode_1024", |b| {
        b.iter(|| black_box(Chunk::decode(black_box(&datagram))))
    });
    group.finish();
}

fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassembly");
    let source: IpAddr = "192.168.168.55".parse().unwrap();

    // Chunk indices wrap at 256, so frames stay below 256 chunks.
    for frame_len in [16 * 1024, 64 * 1024, 200 * 1024] {
        let frame = datagrams(frame_len);
        let reassembler = Reassembler::new(Arc::new(DeviceRegistry::new()), &IngestConfig::default());

        group.throughput(Throughput::Bytes(frame_len as u64));
        group.bench_function(format!("frame_{frame_len}"), |b| {
            b.iter(|| {
                for datagram in &frame {
                    black_box(reassembler.handle_datagram(source, datagram));
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_reassembly);
criterion_main!(benches);
