//! 风险收益指标计算
//!
//! 核心指标:
//! - 年化平均收益率 (Average Return): 日收益率均值 × 252
//! - 年化波动率 (Volatility): 日收益率样本标准差 × √252
//! - 夏普比率 (Sharpe Ratio): 年化收益 / 年化波动率，波动率为0时记为0

use ndarray::Array1;
use serde::Serialize;

use crate::error::MetricsError;
use crate::trading::model::PriceSeries;

/// 一年的交易日数 (用于年化计算)
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// 风险指标计算结果
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RiskMetrics {
    /// 年化平均收益率
    pub average_return: f64,
    /// 年化波动率
    pub volatility: f64,
    /// 夏普比率
    pub sharpe_ratio: f64,
}

/// 计算日收益率序列，第一个点没有前值，直接丢弃
///
/// 收盘价必须为正的有限值，否则返回 `InvalidPrice`
pub fn daily_returns(series: &PriceSeries) -> Result<Vec<f64>, MetricsError> {
    if series.len() < 2 {
        return Err(MetricsError::InsufficientData {
            points: series.len(),
        });
    }

    for (index, close) in series.closes().enumerate() {
        if !close.is_finite() || close <= 0.0 {
            return Err(MetricsError::InvalidPrice {
                index,
                price: close,
            });
        }
    }

    let closes: Vec<f64> = series.closes().collect();
    Ok(closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect())
}

/// 计算年化收益、年化波动率与夏普比率
pub fn calculate(series: &PriceSeries) -> Result<RiskMetrics, MetricsError> {
    let returns = Array1::from_vec(daily_returns(series)?);

    let mean = returns
        .mean()
        .ok_or(MetricsError::InsufficientData { points: series.len() })?;
    let std = sample_std(&returns);

    let average_return = mean * TRADING_DAYS_PER_YEAR;
    let volatility = std * TRADING_DAYS_PER_YEAR.sqrt();
    let sharpe_ratio = if volatility != 0.0 {
        average_return / volatility
    } else {
        0.0
    };

    if !average_return.is_finite() {
        return Err(MetricsError::NonFinite("average_return"));
    }
    if !volatility.is_finite() {
        return Err(MetricsError::NonFinite("volatility"));
    }
    if !sharpe_ratio.is_finite() {
        return Err(MetricsError::NonFinite("sharpe_ratio"));
    }

    Ok(RiskMetrics {
        average_return,
        volatility,
        sharpe_ratio,
    })
}

/// 扣除无风险利率后的夏普比率
///
/// 年化无风险利率先换算为日利率 `(1 + rf)^(1/252) - 1`，
/// 再用超额日收益均值 / 日收益标准差 × √252
pub fn excess_sharpe_ratio(series: &PriceSeries, risk_free_rate: f64) -> Result<f64, MetricsError> {
    let returns = Array1::from_vec(daily_returns(series)?);
    let daily_rf = (1.0 + risk_free_rate).powf(1.0 / TRADING_DAYS_PER_YEAR) - 1.0;

    let excess = &returns - daily_rf;
    let excess_mean = excess
        .mean()
        .ok_or(MetricsError::InsufficientData { points: series.len() })?;
    let std = sample_std(&returns);

    if std == 0.0 {
        return Ok(0.0);
    }
    let sharpe = excess_mean / std * TRADING_DAYS_PER_YEAR.sqrt();
    if !sharpe.is_finite() {
        return Err(MetricsError::NonFinite("excess_sharpe_ratio"));
    }
    Ok(sharpe)
}

// 样本标准差 (ddof = 1)；只有一个收益率时无定义，按0处理
fn sample_std(returns: &Array1<f64>) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    returns.std(1.0)
}
