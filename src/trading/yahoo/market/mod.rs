use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;
use crate::trading::model::{LookbackRange, PricePoint};
use crate::trading::yahoo::YahooClient;

#[derive(Deserialize, Debug)]
pub struct ChartResponse {
    pub chart: ChartBody,
}

#[derive(Deserialize, Debug)]
pub struct ChartBody {
    pub result: Option<Vec<ChartData>>,
    pub error: Option<YahooApiError>,
}

#[derive(Deserialize, Debug)]
pub struct ChartData {
    pub meta: Option<ChartMeta>,
    /// 交易日开盘时刻的 Unix 秒；无交易数据时缺失
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Deserialize, Debug)]
pub struct ChartMeta {
    pub symbol: Option<String>,
    pub currency: Option<String>,
    /// 交易所相对 UTC 的偏移（秒）
    pub gmtoffset: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteIndicator>,
}

#[derive(Deserialize, Debug)]
pub struct QuoteIndicator {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug)]
pub struct YahooApiError {
    pub code: String,
    pub description: Option<String>,
}

impl YahooClient {
    /**
    获取日线历史收盘价
    symbol  String 是 股票代码，如 AAPL / BRK-B
    range   String 是 回看窗口 1mo/3mo/6mo/1y/2y/5y/ytd/max
    interval 固定为 1d
    **/
    pub async fn get_price_history(
        &self,
        symbol: &str,
        lookback: LookbackRange,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        let path = format!(
            "/v8/finance/chart/{}?range={}&interval=1d&events=history",
            symbol,
            lookback.as_str()
        );
        let res: ChartResponse = self.send_request(&path).await?;
        parse_chart(symbol, res)
    }
}

/// 把 chart 响应转换成收盘价序列，空收盘价（停牌等）直接跳过
pub fn parse_chart(symbol: &str, res: ChartResponse) -> Result<Vec<PricePoint>, ProviderError> {
    if let Some(error) = res.chart.error {
        let description = error.description.unwrap_or_else(|| error.code.clone());
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Err(ProviderError::NotFound(description));
        }
        return Err(ProviderError::Malformed(format!("{}: {}", error.code, description)));
    }

    let Some(data) = res.chart.result.and_then(|r| r.into_iter().next()) else {
        debug!("chart 无结果: {}", symbol);
        return Ok(Vec::new());
    };
    let Some(timestamps) = data.timestamp else {
        debug!("chart 无时间戳: {}", symbol);
        return Ok(Vec::new());
    };
    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    if closes.len() != timestamps.len() {
        return Err(ProviderError::Malformed(format!(
            "时间戳数量 {} 与收盘价数量 {} 不一致",
            timestamps.len(),
            closes.len()
        )));
    }

    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let mut points = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.into_iter().zip(closes) {
        let Some(close) = close else {
            continue;
        };
        let date = trading_date(ts, offset)
            .ok_or_else(|| ProviderError::Malformed(format!("无效时间戳: {}", ts)))?;
        points.push(PricePoint::new(date, close));
    }
    Ok(points)
}

// 按交易所时区换算交易日
fn trading_date(ts: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(ts.checked_add(gmtoffset)?, 0).map(|dt| dt.date_naive())
}
