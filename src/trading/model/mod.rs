pub mod metrics_table;
pub mod portfolio;
pub mod price_series;
pub mod ticker_metrics;

pub use metrics_table::MetricsTable;
pub use portfolio::{Holding, Portfolio};
pub use price_series::{LookbackRange, PricePoint, PriceSeries};
pub use ticker_metrics::TickerMetrics;
