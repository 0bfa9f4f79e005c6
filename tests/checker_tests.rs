// tests/checker_tests.rs
mod common;

use common::{target, ScriptedProber, TestServer};
use site_checker::checker::{Checker, CheckerError};
use site_checker::health::summarize;
use site_checker::probe::{FailureKind, HttpProber, DEFAULT_USER_AGENT};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn http_prober() -> Arc<HttpProber> {
    Arc::new(HttpProber::new(DEFAULT_USER_AGENT, true).unwrap())
}

#[tokio::test]
async fn test_results_follow_target_order_not_completion_order() {
    let server = TestServer::start().await;
    // Earlier targets answer later.
    let targets = vec![
        target("slowest", server.url("/delay/300/200")),
        target("slow", server.url("/delay/150/200")),
        target("fast", server.url("/delay/0/200")),
        target("missing", server.url("/status/404")),
    ];

    let checker = Checker::new(http_prober(), targets.clone(), 4).unwrap();
    let result = checker.check_all().await;

    assert_eq!(result.len(), targets.len());
    for (outcome, target) in result.iter().zip(&targets) {
        assert_eq!(&outcome.target, target);
    }
    assert_eq!(result.outcomes[3].status_code, 404);
}

#[tokio::test]
async fn test_concurrency_limit_bounds_outstanding_requests() {
    let server = TestServer::start().await;
    let targets: Vec<_> = (0..6)
        .map(|i| target(&format!("site-{}", i), server.url("/delay/150/200")))
        .collect();

    let checker = Checker::new(http_prober(), targets, 2).unwrap();
    let result = checker.check_all().await;

    assert_eq!(result.len(), 6);
    assert!(result.iter().all(|o| o.success));
    assert_eq!(server.in_flight.total(), 6);
    assert!(server.in_flight.max() <= 2, "max in flight was {}", server.in_flight.max());
}

#[tokio::test]
async fn test_limit_of_one_serializes_probes() {
    let server = TestServer::start().await;
    let targets: Vec<_> = (0..5)
        .map(|i| target(&format!("site-{}", i), server.url("/delay/100/200")))
        .collect();

    let checker = Checker::new(http_prober(), targets, 1).unwrap();
    let started = Instant::now();
    let result = checker.check_all().await;

    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(result.len(), 5);
    assert_eq!(server.in_flight.max(), 1);
}

#[tokio::test]
async fn test_scripted_probes_respect_limit() {
    let prober = Arc::new(ScriptedProber::new(Duration::from_millis(50)));
    let in_flight = prober.in_flight.clone();
    let targets: Vec<_> = (0..10)
        .map(|i| target(&format!("site-{}", i), "scripted://200"))
        .collect();

    let checker = Checker::new(prober, targets, 3).unwrap();
    let result = checker.check_all().await;

    assert_eq!(result.len(), 10);
    assert_eq!(in_flight.total(), 10);
    assert!(in_flight.max() <= 3);
}

#[tokio::test]
async fn test_mixed_sweep_summary() {
    let server = TestServer::start().await;
    let targets = vec![
        target("alpha", server.url("/ok")),
        target("beta", server.url("/delay/50/503")),
        target("gamma", server.url("/ok")),
    ];

    let checker = Checker::new(http_prober(), targets, 3).unwrap();
    let summary = summarize(&checker.check_all().await);

    assert!(!summary.all_healthy);
    assert_eq!(summary.failing_count, 1);
    assert_eq!(summary.failing[0].status_code, 503);
    assert_eq!(summary.failing[0].target.name, "beta");
    assert_eq!(summary.formatted_report.lines().count(), 3);
}

#[tokio::test]
async fn test_bad_target_does_not_abort_sweep() {
    let server = TestServer::start().await;
    let targets = vec![
        target("malformed", "::not a url::"),
        target("alpha", server.url("/ok")),
    ];

    let checker = Checker::new(http_prober(), targets, 1).unwrap();
    let result = checker.check_all().await;

    assert_eq!(result.len(), 2);
    assert_eq!(
        result.outcomes[0].failure_kind(),
        Some(FailureKind::RequestConstruction)
    );
    assert!(result.outcomes[1].success);
}

#[tokio::test]
async fn test_panicking_probe_still_fills_its_slot() {
    let prober = Arc::new(ScriptedProber::new(Duration::from_millis(1)));
    let targets = vec![
        target("first", "scripted://200"),
        target("panic", "scripted://200"),
        target("last", "scripted://500"),
    ];

    let checker = Checker::new(prober, targets, 2).unwrap();
    let result = checker.check_all().await;

    assert_eq!(result.len(), 3);
    assert!(result.outcomes[0].success);
    assert_eq!(result.outcomes[1].target.name, "panic");
    assert_eq!(result.outcomes[1].failure_kind(), Some(FailureKind::Connection));
    assert_eq!(result.outcomes[2].status_code, 500);
}

#[tokio::test]
async fn test_zero_concurrency_is_rejected() {
    let result = Checker::new(http_prober(), vec![target("a", "http://localhost/")], 0);
    assert!(matches!(result, Err(CheckerError::InvalidConcurrencyLimit(0))));
}

#[tokio::test]
async fn test_empty_target_list() {
    let checker = Checker::new(http_prober(), Vec::new(), 2).unwrap();
    let result = checker.check_all().await;
    assert!(result.is_empty());
    assert!(summarize(&result).all_healthy);
}
