// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for call decoding and full dispatch round trips
// (owning loop -> worker -> owning loop) in the lovegame-bridge crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use lovegame_bridge::operations::PERFORM_ACTION;
use lovegame_bridge::{JsonMethodCodec, MainQueue, MethodChannel};
use lovegame_core::BridgeConfig;
use lovegame_core::types::{Outcome, Value};

fn perform_action_call() -> Vec<u8> {
    let args: Value = [("type", "like")].into_iter().collect();
    JsonMethodCodec::encode_method_call(PERFORM_ACTION, Some(&args)).expect("encode")
}

fn bench_decode(c: &mut Criterion) {
    let call = perform_action_call();
    c.bench_function("decode_method_call", |b| {
        b.iter(|| JsonMethodCodec::decode_method_call(black_box(&call)))
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let queue = MainQueue::new();
    let channel = MethodChannel::with_builtin(&BridgeConfig::default(), Arc::new(queue.handle()))
        .expect("channel");
    channel.install().expect("install");
    queue.pump();

    let call = perform_action_call();
    let delivered = Arc::new(AtomicUsize::new(0));

    let mut group = c.benchmark_group("dispatch");
    for batch in [1usize, 16] {
        group.bench_function(format!("perform_action_x{batch}"), |b| {
            b.iter(|| {
                let target = delivered.load(Ordering::Relaxed) + batch;
                for _ in 0..batch {
                    let (method, args) =
                        JsonMethodCodec::decode_method_call(&call).expect("decode");
                    let counter = Arc::clone(&delivered);
                    channel.handle(&method, args, move |outcome: Outcome| {
                        black_box(outcome);
                        counter.fetch_add(1, Ordering::Relaxed);
                    });
                }
                queue.run_until(Duration::from_secs(5), || {
                    delivered.load(Ordering::Relaxed) >= target
                });
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode, bench_round_trip);
criterion_main!(benches);
