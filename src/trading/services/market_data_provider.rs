//! 行情数据提供方抽象接口
//!
//! services层依赖接口，具体的数据源（Yahoo 等）在 trading::yahoo 中实现；
//! 测试中可以注入内存实现

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::trading::model::{LookbackRange, PricePoint};

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 数据源名称
    fn name(&self) -> &'static str;

    /// 获取日线收盘价历史
    ///
    /// # Arguments
    /// * `symbol` - 股票代码（如"AAPL"）
    /// * `lookback` - 回看窗口
    ///
    /// # Returns
    /// * 收盘价列表，代码无数据时可能为空
    async fn fetch_price_history(
        &self,
        symbol: &str,
        lookback: LookbackRange,
    ) -> Result<Vec<PricePoint>, ProviderError>;

    /// 获取市值（尽力而为）
    ///
    /// # Returns
    /// * `Ok(None)` - 数据源没有提供市值
    async fn fetch_market_cap(&self, symbol: &str) -> Result<Option<f64>, ProviderError>;
}
