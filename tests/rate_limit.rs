use std::sync::Arc;
use std::time::Duration;
use weathergate::prelude::*;
use weathergate::rate_limit::counter_key;
use weathergate::telemetry::RateLimitEvent;

#[tokio::test(start_paused = true)]
async fn five_per_window_then_reset_after_expiry() {
    let store = Arc::new(InMemoryStore::new());
    let limiter = FixedWindow::new(store.clone());

    for n in 1..=5 {
        let d = limiter.admit("198.51.100.4").await;
        assert!(d.is_allowed(), "request {n} should be admitted");
    }

    match limiter.admit("198.51.100.4").await {
        Decision::Denied { wait, limit } => {
            assert_eq!(limit, 5);
            assert_eq!(wait, Duration::from_secs(60));
        }
        other => panic!("expected denied, got {other:?}"),
    }

    // Rejections keep counting but never move the window.
    assert_eq!(store.ttl(&counter_key("198.51.100.4")), Some(Duration::from_secs(60)));

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(
        limiter.admit("198.51.100.4").await,
        Decision::Allowed { remaining: 4, limit: 5 },
        "a new window starts with a fresh count of 1"
    );
}

#[tokio::test]
async fn clients_are_counted_independently() {
    let limiter = FixedWindow::new(Arc::new(InMemoryStore::new()));

    for _ in 0..6 {
        limiter.admit("a").await;
    }
    assert!(!limiter.admit("a").await.is_allowed());
    assert!(limiter.admit("b").await.is_allowed());
}

#[tokio::test]
async fn store_failure_admits_regardless_of_prior_count() {
    let store = Arc::new(InMemoryStore::new());
    let sink = MemorySink::new();
    let limiter = FixedWindow::new(store.clone()).with_sink(sink.clone());

    for _ in 0..10 {
        limiter.admit("c").await;
    }
    assert!(!limiter.admit("c").await.is_allowed());

    store.set_available(false);
    for _ in 0..3 {
        assert!(limiter.admit("c").await.is_allowed());
    }

    let failed_open = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, GatewayEvent::RateLimit(RateLimitEvent::FailedOpen { .. })))
        .count();
    assert_eq!(failed_open, 3);
}

#[tokio::test]
async fn concurrent_requests_never_share_a_count() {
    let store = Arc::new(InMemoryStore::new());
    let limiter = Arc::new(FixedWindow::new(store.clone()).with_limit(20));

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.admit("burst").await.is_allowed() })
        })
        .collect();

    let mut admitted = 0;
    for handle in futures::future::join_all(handles).await {
        if handle.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 20);
    assert_eq!(store.get(&counter_key("burst")).await.unwrap().as_deref(), Some("50"));
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out_and_fails_open() {
    use async_trait::async_trait;

    struct Stalled;

    #[async_trait]
    impl KeyValueStore for Stalled {
        type Error = std::io::Error;

        async fn get(&self, _key: &str) -> Result<Option<String>, Self::Error> {
            Ok(None)
        }
        async fn set_with_ttl(&self, _k: &str, _v: &str, _t: Duration) -> Result<(), Self::Error> {
            Ok(())
        }
        async fn incr(&self, _key: &str) -> Result<i64, Self::Error> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(99)
        }
        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool, Self::Error> {
            Ok(true)
        }
        async fn ping(&self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    let limiter = FixedWindow::new(Arc::new(Stalled)).with_store_timeout(Duration::from_millis(100));
    assert!(limiter.admit("d").await.is_allowed());
}
