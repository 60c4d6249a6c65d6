use serde::Serialize;

use crate::trading::indicator::risk_metrics::RiskMetrics;

/// 单个代码的风险收益指标，成功获取后创建，之后只读
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerMetrics {
    symbol: String,
    /// 市值，None 表示提供方没有返回（区别于真实的0）
    market_cap: Option<f64>,
    average_return: f64,
    volatility: f64,
    sharpe_ratio: f64,
}

impl TickerMetrics {
    pub fn new(symbol: impl Into<String>, market_cap: Option<f64>, metrics: RiskMetrics) -> Self {
        Self {
            symbol: symbol.into(),
            // 负值或非有限值视为未知
            market_cap: market_cap.filter(|cap| cap.is_finite() && *cap >= 0.0),
            average_return: metrics.average_return,
            volatility: metrics.volatility,
            sharpe_ratio: metrics.sharpe_ratio,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn market_cap(&self) -> Option<f64> {
        self.market_cap
    }

    /// 排序与绘图使用：未知市值按0处理
    pub fn market_cap_or_zero(&self) -> f64 {
        self.market_cap.unwrap_or(0.0)
    }

    /// 千分位格式的市值，未知时为 "n/a"
    pub fn market_cap_label(&self) -> String {
        match self.market_cap {
            Some(cap) => format_thousands(cap),
            None => "n/a".to_string(),
        }
    }

    pub fn average_return(&self) -> f64 {
        self.average_return
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    pub fn sharpe_ratio(&self) -> f64 {
        self.sharpe_ratio
    }
}

/// 3400000000000.0 -> "3,400,000,000,000"
pub fn format_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0.0 && digits != "0" {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(3.4e12), "3,400,000,000,000");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(-12345.0), "-12,345");
    }

    #[test]
    fn test_invalid_market_cap_is_unknown() {
        let metrics = RiskMetrics::default();
        assert_eq!(TickerMetrics::new("AAPL", Some(-1.0), metrics).market_cap(), None);
        assert_eq!(TickerMetrics::new("AAPL", Some(f64::NAN), metrics).market_cap(), None);
        assert_eq!(TickerMetrics::new("AAPL", Some(0.0), metrics).market_cap(), Some(0.0));
        assert_eq!(TickerMetrics::new("AAPL", None, metrics).market_cap_or_zero(), 0.0);
    }
}
