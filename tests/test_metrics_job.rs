mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::{rising_closes, MockProvider};
use sharpe_scan::error::AppError;
use sharpe_scan::trading::services::{RetryPolicy, SkipReason, TickerMetricsService};
use sharpe_scan::trading::task::{BatchProgress, MetricsJob};

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn job(provider: Arc<MockProvider>, concurrency: usize) -> MetricsJob {
    let service = TickerMetricsService::new(provider)
        .with_fetch_timeout(Duration::from_secs(5))
        .with_retry(RetryPolicy::none());
    MetricsJob::new(service, concurrency)
}

#[tokio::test]
async fn test_failure_isolation() {
    let provider = Arc::new(
        MockProvider::new()
            .with_history("AAPL", &rising_closes(252))
            .with_history("GOOGL", &[100.0, 101.0, 99.5, 102.0])
            .with_market_cap("AAPL", 3.4e12)
            .with_market_cap("GOOGL", 2.1e12),
    );

    let report = job(provider, 3)
        .collect(&symbols(&["AAPL", "INVALID_XYZ", "GOOGL"]), |_| {})
        .await;

    assert_eq!(report.total(), 3);
    assert_eq!(report.fetched().len(), 2);
    assert_eq!(report.skipped().len(), 1);
    assert_eq!(report.skipped()[0].symbol, "INVALID_XYZ");
    assert_eq!(report.skipped()[0].reason, SkipReason::NoHistoricalData);

    let table = report.into_table().unwrap();
    let order: Vec<&str> = table.iter().map(|r| r.symbol()).collect();
    assert_eq!(order, vec!["AAPL", "GOOGL"]);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let provider = Arc::new(
        MockProvider::new()
            .with_fallback_history(&[100.0, 101.0, 102.5])
            .with_delay(Duration::from_millis(2))
            .with_concurrency_probe(20),
    );
    let list: Vec<String> = (0..500).map(|i| format!("T{:03}", i)).collect();

    let report = job(provider.clone(), 20).collect(&list, |_| {}).await;

    assert_eq!(report.fetched().len(), 500);
    assert!(report.skipped().is_empty());
    assert_eq!(provider.violations(), 0);
    assert!(provider.max_in_flight() <= 20);
    assert!(provider.max_in_flight() > 1);
}

#[tokio::test]
async fn test_all_failures_yield_empty_result() {
    let provider = Arc::new(MockProvider::new());

    let report = job(provider, 4)
        .collect(&symbols(&["NOPE1", "NOPE2", "NOPE3"]), |_| {})
        .await;

    assert_eq!(report.skipped().len(), 3);
    assert!(matches!(report.into_table(), Err(AppError::EmptyResult)));
}

#[tokio::test]
async fn test_empty_input_yields_empty_result() {
    let provider = Arc::new(MockProvider::new());
    let report = job(provider, 4).collect(&[], |_| {}).await;
    assert_eq!(report.total(), 0);
    assert!(matches!(report.into_table(), Err(AppError::EmptyResult)));
}

#[tokio::test]
async fn test_slow_ticker_times_out() {
    let provider = Arc::new(
        MockProvider::new()
            .with_history("AAPL", &rising_closes(30))
            .with_history("SLOW", &rising_closes(30))
            .with_slow("SLOW"),
    );
    let service = TickerMetricsService::new(provider)
        .with_fetch_timeout(Duration::from_millis(100))
        .with_retry(RetryPolicy::none());

    let report = MetricsJob::new(service, 2)
        .collect(&symbols(&["AAPL", "SLOW"]), |_| {})
        .await;

    assert_eq!(report.fetched().len(), 1);
    assert_eq!(report.skipped()[0].symbol, "SLOW");
    assert_eq!(
        report.skipped()[0].reason,
        SkipReason::Timeout(Duration::from_millis(100))
    );
}

#[tokio::test]
async fn test_cancelled_before_start_makes_no_requests() {
    let provider = Arc::new(MockProvider::new().with_fallback_history(&rising_closes(10)));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = job(provider.clone(), 4)
        .with_cancel_token(cancel)
        .collect(&symbols(&["AAPL", "MSFT", "GOOGL"]), |_| {})
        .await;

    assert!(report.fetched().is_empty());
    assert_eq!(report.cancelled_count(), 3);
    assert_eq!(provider.history_calls(), 0);
}

#[tokio::test]
async fn test_cancel_during_batch_accounts_for_every_symbol() {
    let provider = Arc::new(
        MockProvider::new()
            .with_history("FAST", &rising_closes(10))
            .with_history("SLOW1", &rising_closes(10))
            .with_history("SLOW2", &rising_closes(10))
            .with_slow("SLOW1")
            .with_slow("SLOW2"),
    );
    let job = job(provider, 3);
    let cancel = job.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let report = job
        .collect(&symbols(&["FAST", "SLOW1", "SLOW2"]), |_| {})
        .await;

    assert_eq!(report.fetched().len(), 1);
    assert_eq!(report.fetched()[0].symbol(), "FAST");
    assert_eq!(report.cancelled_count(), 2);
    assert_eq!(report.fetched().len() + report.skipped().len(), 3);
}

#[tokio::test]
async fn test_duplicates_fetched_once() {
    let provider = Arc::new(MockProvider::new().with_fallback_history(&rising_closes(10)));

    let report = job(provider.clone(), 4)
        .collect(&symbols(&["AAPL", " aapl ", "MSFT", "AAPL"]), |_| {})
        .await;

    assert_eq!(report.fetched().len(), 2);
    assert_eq!(report.skipped().len(), 2);
    assert!(report
        .skipped()
        .iter()
        .all(|s| s.symbol == "AAPL" && s.reason == SkipReason::Duplicate));
    assert_eq!(provider.history_calls(), 2);
}

#[tokio::test]
async fn test_progress_reported_for_every_symbol() {
    let provider = Arc::new(
        MockProvider::new()
            .with_history("AAPL", &rising_closes(10))
            .with_history("MSFT", &rising_closes(10)),
    );
    let mut events: Vec<BatchProgress> = Vec::new();

    job(provider, 2)
        .collect(&symbols(&["AAPL", "MSFT", "BAD", "AAPL"]), |p| {
            events.push(p.clone())
        })
        .await;

    assert_eq!(events.len(), 4);
    let completed: Vec<usize> = events.iter().map(|e| e.completed).collect();
    assert_eq!(completed, vec![1, 2, 3, 4]);
    assert!(events.iter().all(|e| e.total == 4));
    assert_eq!(events.iter().filter(|e| e.fetched).count(), 2);
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let provider = Arc::new(
        MockProvider::new()
            .with_history("AAPL", &rising_closes(10))
            .with_transient_failures("AAPL", 2),
    );
    let service = TickerMetricsService::new(provider.clone()).with_retry(RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
    });

    let report = MetricsJob::new(service, 1)
        .collect(&symbols(&["AAPL"]), |_| {})
        .await;

    assert_eq!(report.fetched().len(), 1);
    assert_eq!(provider.history_calls(), 3);
}

#[tokio::test]
async fn test_retries_exhausted_become_skip() {
    let provider = Arc::new(
        MockProvider::new()
            .with_history("AAPL", &rising_closes(10))
            .with_transient_failures("AAPL", 5),
    );
    let service = TickerMetricsService::new(provider.clone()).with_retry(RetryPolicy {
        max_retries: 1,
        base_delay: Duration::from_millis(1),
    });

    let report = MetricsJob::new(service, 1)
        .collect(&symbols(&["AAPL"]), |_| {})
        .await;

    assert!(report.fetched().is_empty());
    assert!(matches!(report.skipped()[0].reason, SkipReason::Provider(_)));
    assert_eq!(provider.history_calls(), 2);
}

#[tokio::test]
async fn test_short_history_and_blank_symbol_skipped() {
    let provider = Arc::new(
        MockProvider::new()
            .with_history("ONE", &[100.0])
            .with_history("EMPTY", &[]),
    );

    let report = job(provider, 2)
        .collect(&symbols(&["ONE", "EMPTY", "   "]), |_| {})
        .await;

    let reason_of = |symbol: &str| {
        report
            .skipped()
            .iter()
            .find(|s| s.symbol == symbol)
            .map(|s| s.reason.clone())
    };
    assert_eq!(
        reason_of("ONE"),
        Some(SkipReason::InsufficientData { points: 1 })
    );
    assert_eq!(reason_of("EMPTY"), Some(SkipReason::NoHistoricalData));
    assert_eq!(reason_of(""), Some(SkipReason::InvalidSymbol));
}

#[tokio::test]
async fn test_market_cap_failure_is_not_fatal() {
    let provider = Arc::new(
        MockProvider::new()
            .with_history("AAPL", &rising_closes(10))
            .with_history("MSFT", &rising_closes(10))
            .with_failing_market_cap("AAPL")
            .with_market_cap("MSFT", 3.0e12),
    );

    let table = job(provider, 2)
        .collect(&symbols(&["AAPL", "MSFT"]), |_| {})
        .await
        .into_table()
        .unwrap();

    assert_eq!(table.rows()[0].symbol(), "MSFT");
    assert_eq!(table.rows()[1].symbol(), "AAPL");
    assert_eq!(table.rows()[1].market_cap(), None);
    assert_eq!(table.rows()[1].market_cap_label(), "n/a");
}

#[tokio::test]
async fn test_slow_market_cap_keeps_ticker() {
    let provider = Arc::new(
        MockProvider::new()
            .with_history("AAPL", &[180.0, 182.0, 181.0, 185.0])
            .with_market_cap("AAPL", 3.4e12)
            .with_slow_market_cap("AAPL"),
    );
    let service = TickerMetricsService::new(provider)
        .with_fetch_timeout(Duration::from_millis(200))
        .with_retry(RetryPolicy::none());

    let report = MetricsJob::new(service, 1)
        .collect(&symbols(&["AAPL"]), |_| {})
        .await;

    assert!(report.skipped().is_empty());
    assert_eq!(report.fetched().len(), 1);
    assert_eq!(report.fetched()[0].symbol(), "AAPL");
    assert_eq!(report.fetched()[0].market_cap(), None);
    assert!(report.fetched()[0].average_return().is_finite());
}
