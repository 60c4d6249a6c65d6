//! 批量并发采集任务
//!
//! 以固定并发数对一批代码调用 `TickerMetricsService::fetch`，
//! 单个代码失败只记录跳过原因，不影响其他代码

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::trading::model::{MetricsTable, TickerMetrics};
use crate::trading::services::ticker_metrics_service::{
    normalize_symbol, FetchOutcome, SkipReason, SkippedTicker, TickerMetricsService,
};

/// 每完成一个代码回调一次
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub symbol: String,
    pub fetched: bool,
}

/// 默认进度输出
pub fn log_progress(progress: &BatchProgress) {
    info!("[{}/{}] completed", progress.completed, progress.total);
}

/// 一次批量采集的结果：成功记录 + 跳过记录，二者之和等于输入数量
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    total: usize,
    fetched: Vec<TickerMetrics>,
    skipped: Vec<SkippedTicker>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn fetched(&self) -> &[TickerMetrics] {
        &self.fetched
    }

    pub fn skipped(&self) -> &[SkippedTicker] {
        &self.skipped
    }

    pub fn cancelled_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| s.reason == SkipReason::Cancelled)
            .count()
    }

    /// 汇总为按市值排序的指标表；没有任何成功记录时返回 `EmptyResult`
    pub fn into_table(self) -> Result<MetricsTable, AppError> {
        MetricsTable::from_records(self.fetched)
    }
}

pub struct MetricsJob {
    service: TickerMetricsService,
    concurrency: usize,
    cancel: CancellationToken,
}

impl MetricsJob {
    pub fn new(service: TickerMetricsService, concurrency: usize) -> Self {
        Self {
            service,
            concurrency: concurrency.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// 使用外部的取消令牌（例如 Ctrl+C 处理器持有的令牌）
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 并发采集所有代码
    ///
    /// # Arguments
    /// * `symbols` - 代码列表，重复代码只请求一次
    /// * `on_progress` - 每完成一个代码调用一次
    pub async fn collect<F>(&self, symbols: &[String], mut on_progress: F) -> BatchReport
    where
        F: FnMut(&BatchProgress),
    {
        let total = symbols.len();
        info!(
            "Collecting metrics for {} tickers with {} workers...",
            total, self.concurrency
        );

        let mut report = BatchReport {
            total,
            fetched: Vec::new(),
            skipped: Vec::new(),
        };
        let mut completed = 0usize;

        let mut seen = HashSet::new();
        let mut unique: Vec<&str> = Vec::with_capacity(total);
        for symbol in symbols {
            let normalized = normalize_symbol(symbol);
            if !normalized.is_empty() && !seen.insert(normalized.clone()) {
                debug!("重复代码，跳过: {}", normalized);
                completed += 1;
                on_progress(&BatchProgress {
                    completed,
                    total,
                    symbol: normalized.clone(),
                    fetched: false,
                });
                report
                    .skipped
                    .push(SkippedTicker::new(normalized, SkipReason::Duplicate));
                continue;
            }
            unique.push(symbol.as_str());
        }

        let service = &self.service;
        let cancel = &self.cancel;
        let mut outcomes = stream::iter(unique)
            .map(|symbol| async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => FetchOutcome::Skipped(SkippedTicker::new(
                        normalize_symbol(symbol),
                        SkipReason::Cancelled,
                    )),
                    outcome = service.fetch(symbol) => outcome,
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some(outcome) = outcomes.next().await {
            completed += 1;
            let progress = BatchProgress {
                completed,
                total,
                symbol: outcome.symbol().to_string(),
                fetched: outcome.is_fetched(),
            };

            match outcome {
                FetchOutcome::Fetched(metrics) => report.fetched.push(metrics),
                FetchOutcome::Skipped(skipped) => {
                    if skipped.reason == SkipReason::Cancelled {
                        debug!("  - {} 已取消", skipped.symbol);
                    } else {
                        warn!("  - Skipping {}: {}", skipped.symbol, skipped.reason);
                    }
                    report.skipped.push(skipped);
                }
            }
            on_progress(&progress);
        }

        let cancelled = report.cancelled_count();
        if cancelled > 0 {
            warn!("⚠️  批次已取消: {} 个代码未完成", cancelled);
        }
        info!(
            "✅ 采集完成: 成功 {}, 跳过 {}, 共 {}",
            report.fetched.len(),
            report.skipped.len(),
            total
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_into_table() {
        let report = BatchReport::default();
        assert!(matches!(report.into_table(), Err(AppError::EmptyResult)));
    }

    #[test]
    fn test_concurrency_at_least_one() {
        use crate::error::ProviderError;
        use crate::trading::model::{LookbackRange, PricePoint};
        use crate::trading::services::market_data_provider::MarketDataProvider;
        use std::sync::Arc;

        struct Never;

        #[async_trait::async_trait]
        impl MarketDataProvider for Never {
            fn name(&self) -> &'static str {
                "never"
            }
            async fn fetch_price_history(
                &self,
                _symbol: &str,
                _lookback: LookbackRange,
            ) -> Result<Vec<PricePoint>, ProviderError> {
                Ok(Vec::new())
            }
            async fn fetch_market_cap(&self, _symbol: &str) -> Result<Option<f64>, ProviderError> {
                Ok(None)
            }
        }

        let job = MetricsJob::new(TickerMetricsService::new(Arc::new(Never)), 0);
        assert_eq!(job.concurrency(), 1);
    }
}
