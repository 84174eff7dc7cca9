//! 블록 인덱스 조회 벤치마크
//!
//! 토큰 파싱 + 정확 일치 조회의 비용과 테이블 크기에 따른 스케일링을
//! 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use packetmap_core::types::{CountryId, NetworkBlock};
use packetmap_geo::AddressBlockIndex;

fn build_index(block_count: u32) -> AddressBlockIndex {
    let blocks: Vec<NetworkBlock> = (0..block_count)
        .map(|i| NetworkBlock {
            key: format!("{}.{}.{}.0/24", 1 + i / 65536 % 223, i / 256 % 256, i % 256)
                .parse()
                .unwrap(),
            country: CountryId(i % 250),
        })
        .collect();
    AddressBlockIndex::from_blocks(&blocks)
}

fn bench_resolve_hit(c: &mut Criterion) {
    let index = build_index(100_000);

    let mut group = c.benchmark_group("resolve");
    group.throughput(Throughput::Elements(1));

    group.bench_function("hit", |b| {
        b.iter(|| index.resolve(black_box("1.128.37.0/24")))
    });

    group.bench_function("miss_unknown_block", |b| {
        b.iter(|| index.resolve(black_box("250.0.0.0/8")))
    });

    group.bench_function("miss_unparseable", |b| {
        b.iter(|| index.resolve(black_box("not-a-cidr-token")))
    });

    group.finish();
}

fn bench_index_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_scaling");

    for block_count in [1_000u32, 10_000, 100_000].iter() {
        let index = build_index(*block_count);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(block_count),
            block_count,
            |b, _| b.iter(|| index.resolve(black_box("1.0.17.0/24"))),
        );
    }

    group.finish();
}

fn bench_index_construction(c: &mut Criterion) {
    let blocks: Vec<NetworkBlock> = (0..10_000u32)
        .map(|i| NetworkBlock {
            key: format!("10.{}.{}.0/24", i / 256 % 256, i % 256).parse().unwrap(),
            country: CountryId(i % 250),
        })
        .collect();

    c.bench_function("from_blocks_10k", |b| {
        b.iter(|| AddressBlockIndex::from_blocks(black_box(&blocks)))
    });
}

criterion_group!(
    benches,
    bench_resolve_hit,
    bench_index_scaling,
    bench_index_construction
);
criterion_main!(benches);
