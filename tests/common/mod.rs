#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Semaphore;

use sharpe_scan::error::ProviderError;
use sharpe_scan::trading::model::{LookbackRange, PricePoint};
use sharpe_scan::trading::services::MarketDataProvider;

pub fn points(closes: &[f64]) -> Vec<PricePoint> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    start
        .iter_days()
        .zip(closes)
        .map(|(date, close)| PricePoint::new(date, *close))
        .collect()
}

/// 线性上涨序列 100 -> 150
pub fn rising_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + 50.0 * i as f64 / (n - 1) as f64)
        .collect()
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 内存行情数据源：未登记的代码返回 NotFound
pub struct MockProvider {
    histories: HashMap<String, Vec<PricePoint>>,
    fallback: Option<Vec<PricePoint>>,
    market_caps: HashMap<String, f64>,
    failing_caps: HashSet<String>,
    slow: HashSet<String>,
    slow_caps: HashSet<String>,
    delay: Duration,
    transient_failures: Mutex<HashMap<String, usize>>,
    limit: Option<Arc<Semaphore>>,
    pub violations: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub history_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            histories: HashMap::new(),
            fallback: None,
            market_caps: HashMap::new(),
            failing_caps: HashSet::new(),
            slow: HashSet::new(),
            slow_caps: HashSet::new(),
            delay: Duration::ZERO,
            transient_failures: Mutex::new(HashMap::new()),
            limit: None,
            violations: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_history(mut self, symbol: &str, closes: &[f64]) -> Self {
        self.histories.insert(symbol.to_string(), points(closes));
        self
    }

    /// 所有未登记的代码都返回该序列
    pub fn with_fallback_history(mut self, closes: &[f64]) -> Self {
        self.fallback = Some(points(closes));
        self
    }

    pub fn with_market_cap(mut self, symbol: &str, cap: f64) -> Self {
        self.market_caps.insert(symbol.to_string(), cap);
        self
    }

    pub fn with_failing_market_cap(mut self, symbol: &str) -> Self {
        self.failing_caps.insert(symbol.to_string());
        self
    }

    /// 该代码的请求挂起 10 秒
    pub fn with_slow(mut self, symbol: &str) -> Self {
        self.slow.insert(symbol.to_string());
        self
    }

    /// 只有该代码的市值请求挂起 10 秒，历史数据立即返回
    pub fn with_slow_market_cap(mut self, symbol: &str) -> Self {
        self.slow_caps.insert(symbol.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 前 `times` 次历史数据请求返回网络错误
    pub fn with_transient_failures(self, symbol: &str, times: usize) -> Self {
        self.transient_failures
            .lock()
            .unwrap()
            .insert(symbol.to_string(), times);
        self
    }

    /// 用计数信号量检查同时进行的请求数，超过 `limit` 记一次违规
    pub fn with_concurrency_probe(mut self, limit: usize) -> Self {
        self.limit = Some(Arc::new(Semaphore::new(limit)));
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self, symbol: &str) {
        let permit = self.limit.as_ref().map(|s| s.clone().try_acquire_owned());
        if let Some(Err(_)) = permit {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.slow.contains(symbol) {
            tokio::time::sleep(Duration::from_secs(10)).await;
        } else if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        drop(permit);
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_price_history(
        &self,
        symbol: &str,
        _lookback: LookbackRange,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency(symbol).await;

        {
            let mut failures = self.transient_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(symbol) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ProviderError::Transport("connection reset".to_string()));
                }
            }
        }

        self.histories
            .get(symbol)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))
    }

    async fn fetch_market_cap(&self, symbol: &str) -> Result<Option<f64>, ProviderError> {
        self.simulate_latency(symbol).await;
        if self.slow_caps.contains(symbol) {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        if self.failing_caps.contains(symbol) {
            return Err(ProviderError::Http {
                status: 401,
                message: "Unauthorized".to_string(),
            });
        }
        Ok(self.market_caps.get(symbol).copied())
    }
}
