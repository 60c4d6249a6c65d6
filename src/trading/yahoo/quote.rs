use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;
use crate::trading::yahoo::YahooClient;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub quote_response: QuoteBody,
}

#[derive(Deserialize, Debug)]
pub struct QuoteBody {
    #[serde(default)]
    pub result: Vec<QuoteData>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuoteData {
    pub symbol: String,
    pub short_name: Option<String>,
    pub market_cap: Option<f64>,
}

impl YahooClient {
    /// 获取市值，接口未返回时为 None
    ///
    /// quote 接口需要会话 cookie 与 crumb；返回 401 时视为 crumb 过期，重新握手后再试一次
    pub async fn get_market_cap(&self, symbol: &str) -> Result<Option<f64>, ProviderError> {
        let mut refreshed = false;
        loop {
            let crumb = self.crumb().await?;
            let query = [("symbols", symbol), ("crumb", crumb.as_str())];
            match self.send_query::<QuoteResponse>("/v7/finance/quote", &query).await {
                Err(ProviderError::Http { status: 401, .. }) if !refreshed => {
                    debug!("{} crumb 已失效，重新获取", symbol);
                    self.invalidate_crumb().await;
                    refreshed = true;
                }
                res => {
                    return Ok(res?
                        .quote_response
                        .result
                        .into_iter()
                        .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
                        .and_then(|q| q.market_cap))
                }
            }
        }
    }
}
