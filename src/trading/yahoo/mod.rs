//! Yahoo Finance 行情数据源

pub mod market;
pub mod quote;
pub mod yahoo_client;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ProviderError;
use crate::trading::model::{LookbackRange, PricePoint};
use crate::trading::services::market_data_provider::MarketDataProvider;

pub use yahoo_client::{
    YahooClient, YahooClientConfig, BROWSER_USER_AGENT, DEFAULT_YAHOO_COOKIE_URL,
};

#[async_trait]
impl MarketDataProvider for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_price_history(
        &self,
        symbol: &str,
        lookback: LookbackRange,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        debug!("Yahoo: 获取历史收盘价 - {} {}", symbol, lookback);
        self.get_price_history(symbol, lookback).await
    }

    async fn fetch_market_cap(&self, symbol: &str) -> Result<Option<f64>, ProviderError> {
        debug!("Yahoo: 获取市值 - {}", symbol);
        self.get_market_cap(symbol).await
    }
}
