use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;
use weathergate::store::InMemoryStore;
use weathergate::telemetry::MemorySink;
use weathergate::{FixedWindow, RateLimiter};

// Admissions under the limit: one INCR per call, EXPIRE only on the first.
fn admit_under_limit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let limiter = FixedWindow::new(store).with_limit(u64::MAX).with_window(Duration::from_secs(3600));

    c.bench_function("fixed_window_admit", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(limiter.admit(black_box("198.51.100.7")).await);
        });
    });
}

// Saturated window: every call is a rejection and emits an event.
fn admit_rejected(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let limiter = FixedWindow::new(store)
        .with_limit(1)
        .with_window(Duration::from_secs(3600))
        .with_sink(MemorySink::with_capacity(1024));

    c.bench_function("fixed_window_reject", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(limiter.admit(black_box("198.51.100.8")).await);
        });
    });
}

// Store down: every call fails open.
fn admit_fail_open(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(InMemoryStore::new());
    store.set_available(false);
    let limiter = FixedWindow::new(store);

    c.bench_function("fixed_window_fail_open", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(limiter.admit(black_box("198.51.100.9")).await);
        });
    });
}

criterion_group!(benches, admit_under_limit, admit_rejected, admit_fail_open);
criterion_main!(benches);
