//! 单个代码的数据获取与指标计算
//!
//! 所有失败（网络、限流、超时、无数据、数据过短、格式错误）
//! 都转换为 `FetchOutcome::Skipped`，不会向调用方抛出错误

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::{debug, info};

use crate::app_config::ScanConfig;
use crate::error::app_error::format_timeout;
use crate::error::{MetricsError, ProviderError};
use crate::trading::indicator::risk_metrics;
use crate::trading::model::{LookbackRange, PriceSeries, TickerMetrics};
use crate::trading::services::market_data_provider::MarketDataProvider;

/// 跳过原因
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// 代码为空
    InvalidSymbol,
    /// 同一批次中重复出现
    Duplicate,
    /// 数据源没有返回历史数据
    NoHistoricalData,
    /// 价格点不足2个
    InsufficientData { points: usize },
    /// 响应或价格数据不合法
    MalformedResponse(String),
    /// 网络或数据源错误（重试后仍失败）
    Provider(String),
    /// 超过单个代码的整体超时
    Timeout(Duration),
    /// 批次被取消
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidSymbol => write!(f, "无效代码"),
            SkipReason::Duplicate => write!(f, "重复代码"),
            SkipReason::NoHistoricalData => write!(f, "no historical data"),
            SkipReason::InsufficientData { points } => {
                write!(f, "数据不足 ({} 个价格点)", points)
            }
            SkipReason::MalformedResponse(msg) => write!(f, "数据格式错误: {}", msg),
            SkipReason::Provider(msg) => write!(f, "数据源错误: {}", msg),
            SkipReason::Timeout(timeout) => write!(f, "超时 ({})", format_timeout(*timeout)),
            SkipReason::Cancelled => write!(f, "已取消"),
        }
    }
}

impl From<ProviderError> for SkipReason {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(_) => SkipReason::NoHistoricalData,
            ProviderError::Malformed(msg) => SkipReason::MalformedResponse(msg),
            other => SkipReason::Provider(other.to_string()),
        }
    }
}

impl From<MetricsError> for SkipReason {
    fn from(err: MetricsError) -> Self {
        match err {
            MetricsError::InsufficientData { points } => SkipReason::InsufficientData { points },
            other => SkipReason::MalformedResponse(other.to_string()),
        }
    }
}

/// 被跳过的代码及原因
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTicker {
    pub symbol: String,
    pub reason: SkipReason,
}

impl SkippedTicker {
    pub fn new(symbol: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            symbol: symbol.into(),
            reason,
        }
    }
}

/// 单个代码的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(TickerMetrics),
    Skipped(SkippedTicker),
}

impl FetchOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            FetchOutcome::Fetched(metrics) => metrics.symbol(),
            FetchOutcome::Skipped(skipped) => &skipped.symbol,
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched(_))
    }
}

/// 瞬时错误的重试策略（指数退避）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// 首次请求之外的最大重试次数，0 表示不重试
    pub max_retries: usize,
    /// 第一次重试前的等待时间，之后每次翻倍
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// 退避序列: base, 2*base, 4*base ...，单次最长5秒
    fn strategy(&self) -> impl Iterator<Item = Duration> {
        let factor = (self.base_delay.as_millis() as u64 / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(Duration::from_secs(5))
            .take(self.max_retries)
    }
}

/// 代码数据服务：持有显式构造的数据源
#[derive(Clone)]
pub struct TickerMetricsService {
    provider: Arc<dyn MarketDataProvider>,
    lookback: LookbackRange,
    fetch_timeout: Duration,
    retry: RetryPolicy,
}

impl TickerMetricsService {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            lookback: LookbackRange::OneYear,
            fetch_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(provider: Arc<dyn MarketDataProvider>, config: &ScanConfig) -> Self {
        Self::new(provider)
            .with_lookback(config.lookback)
            .with_fetch_timeout(config.fetch_timeout)
            .with_retry(RetryPolicy {
                max_retries: config.max_retries,
                base_delay: config.retry_base_delay,
            })
    }

    pub fn with_lookback(mut self, lookback: LookbackRange) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 获取单个代码的历史数据与市值并计算指标
    pub async fn fetch(&self, symbol: &str) -> FetchOutcome {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return FetchOutcome::Skipped(SkippedTicker::new(symbol, SkipReason::InvalidSymbol));
        }

        match self.fetch_metrics(&symbol).await {
            Ok(metrics) => FetchOutcome::Fetched(metrics),
            Err(reason) => FetchOutcome::Skipped(SkippedTicker::new(symbol, reason)),
        }
    }

    /// 只获取并校验历史收盘价（组合报告复用）
    pub async fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, SkipReason> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(SkipReason::InvalidSymbol);
        }
        tokio::time::timeout(self.fetch_timeout, self.load_series(&symbol))
            .await
            .map_err(|_| SkipReason::Timeout(self.fetch_timeout))?
    }

    async fn fetch_metrics(&self, symbol: &str) -> Result<TickerMetrics, SkipReason> {
        // 超时只约束价格历史；市值尽力而为，用剩余的时间预算
        let started = Instant::now();
        let series = tokio::time::timeout(self.fetch_timeout, self.load_series(symbol))
            .await
            .map_err(|_| SkipReason::Timeout(self.fetch_timeout))??;
        let metrics = risk_metrics::calculate(&series)?;

        let remaining = self.fetch_timeout.saturating_sub(started.elapsed());
        let market_cap = match tokio::time::timeout(remaining, self.load_market_cap(symbol)).await {
            Ok(cap) => cap,
            Err(_) => {
                debug!("{} 市值请求超时，按未知处理", symbol);
                None
            }
        };

        let record = TickerMetrics::new(symbol, market_cap, metrics);
        info!(
            "✓ {}: market_cap={}  return={:.2}%  sharpe={:.2}",
            symbol,
            record.market_cap_label(),
            record.average_return() * 100.0,
            record.sharpe_ratio()
        );
        Ok(record)
    }

    async fn load_series(&self, symbol: &str) -> Result<PriceSeries, SkipReason> {
        let points = RetryIf::spawn(
            self.retry.strategy(),
            || self.provider.fetch_price_history(symbol, self.lookback),
            |e: &ProviderError| {
                let transient = e.is_transient();
                if transient {
                    debug!(
                        "{} 历史数据请求失败，准备重试 ({}): {}",
                        symbol,
                        self.provider.name(),
                        e
                    );
                }
                transient
            },
        )
        .await?;

        if points.is_empty() {
            return Err(SkipReason::NoHistoricalData);
        }
        Ok(PriceSeries::new(points))
    }

    async fn load_market_cap(&self, symbol: &str) -> Option<f64> {
        let result = RetryIf::spawn(
            self.retry.strategy(),
            || self.provider.fetch_market_cap(symbol),
            |e: &ProviderError| e.is_transient(),
        )
        .await;

        match result {
            Ok(cap) => cap,
            Err(e) => {
                debug!("{} 市值获取失败，按未知处理: {}", symbol, e);
                None
            }
        }
    }
}

/// 去除空白并转为大写
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
