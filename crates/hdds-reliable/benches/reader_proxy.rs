// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ReaderProxy hot paths
//!
//! Measures the per-change bookkeeping a writer does for every matched reader:
//! - add + deliver + cumulative ACK of a window of changes
//! - NACK processing over a 256-bit SequenceNumberSet
//! - `change_is_acked` lookups in a ledger with holes

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hdds_reliable::reliability::SequenceNumberSet;
use hdds_reliable::{
    ChangeForReader, ChangeStatus, Durability, GapBuilder, Guid, History, HistoryCache,
    ReaderProxy, ReaderProxyData, Reliability, ResourceLimits,
};

fn started_proxy(capacity: usize) -> ReaderProxy {
    let history = Arc::new(HistoryCache::new(
        Guid::new([1; 12], [0, 0, 0x11, 0x02]),
        History::KeepAll,
        ResourceLimits::default(),
    ));
    let mut proxy = ReaderProxy::new(history, capacity);
    proxy.start(ReaderProxyData::new(
        Guid::new([2; 12], [0, 0, 0x12, 0x07]),
        Reliability::Reliable,
        Durability::Volatile,
    ));
    proxy
}

fn bench_add_deliver_ack(c: &mut Criterion) {
    let mut group = c.benchmark_group("reader_proxy_window");
    for window in [16u64, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, &window| {
            b.iter(|| {
                let mut proxy = started_proxy(window as usize);
                for seq in 1..=window {
                    proxy
                        .add_change(ChangeForReader::new(seq, 0), true, false)
                        .ok();
                    proxy.from_unsent_to_status(seq, ChangeStatus::Unacknowledged, false, true);
                }
                black_box(proxy.acked_changes_set(window + 1));
            });
        });
    }
    group.finish();
}

fn bench_nack_processing(c: &mut Criterion) {
    let base = 1_000u64;
    let mut set = SequenceNumberSet::empty(base);
    for seq in (base..base + 256).step_by(3) {
        set.add(seq);
    }

    c.bench_function("reader_proxy_requested_changes_set", |b| {
        b.iter(|| {
            let mut proxy = started_proxy(2048);
            for seq in 1..=(base + 256) {
                let relevant = seq % 7 != 0;
                proxy
                    .add_change(ChangeForReader::new(seq, 0), relevant, false)
                    .ok();
                proxy.from_unsent_to_status(seq, ChangeStatus::Underway, false, true);
            }
            proxy.perform_nack_supression();
            let mut gaps = GapBuilder::new();
            black_box(proxy.requested_changes_set(&set, &mut gaps));
            black_box(gaps.build());
        });
    });
}

fn bench_change_is_acked(c: &mut Criterion) {
    let mut proxy = started_proxy(8192);
    for seq in 1..=8192u64 {
        proxy
            .add_change(ChangeForReader::new(seq, 0), seq % 5 != 0, false)
            .ok();
    }

    c.bench_function("reader_proxy_change_is_acked", |b| {
        let mut seq = 0u64;
        b.iter(|| {
            seq = seq % 8192 + 1;
            black_box(proxy.change_is_acked(black_box(seq)))
        });
    });
}

criterion_group!(
    benches,
    bench_add_deliver_ack,
    bench_nack_processing,
    bench_change_is_acked
);
criterion_main!(benches);
