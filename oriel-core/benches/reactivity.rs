//! Benchmarks for the reactive engine.
//!
//! Measures the hot paths of a window turn: a signal write fanning out to
//! many effects, a change propagating down a deep memo chain, and the
//! create/destroy churn of a subtree rebuilt on every run.

use std::hint::black_box;
use std::sync::{Arc, Mutex};

use criterion::{criterion_group, criterion_main, Criterion};

use oriel_core::{BodyFn, Runtime, RuntimeConfig, Scope, SessionParams, Signal, WindowId};

type SignalSlot = Arc<Mutex<Option<Signal<i64>>>>;

fn runtime_with(body: BodyFn) -> Runtime {
    let mut rt = Runtime::new(
        WindowId::random(),
        SessionParams::default(),
        Arc::new(RuntimeConfig::default()),
        body,
    );
    // First drain runs the body and every initial computation.
    rt.process_work_queue();
    rt
}

fn take_signal(slot: &SignalSlot) -> Signal<i64> {
    (*slot.lock().unwrap()).expect("body ran")
}

fn fanout_runtime(width: usize) -> (Runtime, Signal<i64>) {
    let slot: SignalSlot = Arc::new(Mutex::new(None));
    let slot_clone = slot.clone();
    let rt = runtime_with(Arc::new(move |cx: &mut Scope<'_>| {
        let source = cx.create_signal(0i64);
        *slot_clone.lock().unwrap() = Some(source);
        for _ in 0..width {
            cx.create_effect(move |cx| {
                black_box(source.get(cx));
            });
        }
    }));
    let source = take_signal(&slot);
    (rt, source)
}

fn chain_runtime(depth: usize) -> (Runtime, Signal<i64>) {
    let slot: SignalSlot = Arc::new(Mutex::new(None));
    let slot_clone = slot.clone();
    let rt = runtime_with(Arc::new(move |cx: &mut Scope<'_>| {
        let source = cx.create_signal(0i64);
        *slot_clone.lock().unwrap() = Some(source);
        let mut last = cx.create_memo(move |cx| source.get(cx) + 1);
        for _ in 1..depth {
            let prev = last;
            last = cx.create_memo(move |cx| prev.get(cx) + 1);
        }
        cx.create_effect(move |cx| {
            black_box(last.get(cx));
        });
    }));
    let source = take_signal(&slot);
    (rt, source)
}

fn churn_runtime(width: usize) -> (Runtime, Signal<i64>) {
    let slot: SignalSlot = Arc::new(Mutex::new(None));
    let slot_clone = slot.clone();
    let rt = runtime_with(Arc::new(move |cx: &mut Scope<'_>| {
        let toggle = cx.create_signal(0i64);
        *slot_clone.lock().unwrap() = Some(toggle);
        // Each rerun destroys the previous subtree and builds a new one.
        cx.create_effect(move |cx| {
            let n = toggle.get(cx);
            for i in 0..width {
                let leaf = cx.create_signal(n + i as i64);
                cx.create_effect(move |cx| {
                    black_box(leaf.get(cx));
                });
            }
        });
    }));
    let toggle = take_signal(&slot);
    (rt, toggle)
}

fn bench_signal_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_fanout");
    for width in [8usize, 64, 256] {
        group.bench_function(format!("effects_{width}"), |b| {
            let (mut rt, source) = fanout_runtime(width);
            let mut next = 1i64;
            b.iter(|| {
                rt.enter(|cx| source.set(cx, next));
                next += 1;
                black_box(rt.process_work_queue())
            });
        });
    }
    group.finish();
}

fn bench_memo_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("memo_chain");
    for depth in [8usize, 64, 256] {
        group.bench_function(format!("depth_{depth}"), |b| {
            let (mut rt, source) = chain_runtime(depth);
            let mut next = 1i64;
            b.iter(|| {
                rt.enter(|cx| source.set(cx, next));
                next += 1;
                black_box(rt.process_work_queue())
            });
        });
    }
    group.finish();
}

fn bench_subtree_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("subtree_churn");
    for width in [4usize, 16, 64] {
        group.bench_function(format!("leaves_{width}"), |b| {
            let (mut rt, toggle) = churn_runtime(width);
            let mut next = 1i64;
            b.iter(|| {
                rt.enter(|cx| toggle.set(cx, next));
                next += 1;
                black_box(rt.process_work_queue())
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = propagation;
    config = Criterion::default();
    targets = bench_signal_fanout, bench_memo_chain
);

criterion_group!(
    name = churn;
    config = Criterion::default().sample_size(50);
    targets = bench_subtree_churn
);

criterion_main!(propagation, churn);
