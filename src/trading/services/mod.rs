pub mod market_data_provider;
pub mod ticker_metrics_service;

pub use market_data_provider::MarketDataProvider;
pub use ticker_metrics_service::{
    FetchOutcome, RetryPolicy, SkipReason, SkippedTicker, TickerMetricsService,
};
