//! Incremental-hasher throughput benchmark.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use verrou_signer::IncrementalHasher;

const STAGING: usize = 230 + 128;

fn hash_chunked(message: &[u8], chunk: usize) -> [u8; 32] {
    let mut hasher = IncrementalHasher::new(STAGING);
    let mut staging = Vec::with_capacity(STAGING);
    for part in message.chunks(chunk) {
        staging.extend_from_slice(part);
        hasher.feed(&mut staging).unwrap();
    }
    hasher.finish(&mut staging).unwrap()
}

fn bench_incremental_hash(c: &mut Criterion) {
    let message: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();

    let mut group = c.benchmark_group("incremental_hash");
    for chunk in [64usize, 230] {
        group.bench_function(format!("4k_message_{chunk}b_packets"), |b| {
            b.iter(|| hash_chunked(black_box(&message), chunk));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_incremental_hash);
criterion_main!(benches);
