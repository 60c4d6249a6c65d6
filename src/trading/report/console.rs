use std::collections::BTreeMap;
use std::fmt::Write;

use crate::trading::indicator::risk_metrics::RiskMetrics;
use crate::trading::model::{MetricsTable, TickerMetrics};
use crate::trading::services::ticker_metrics_service::{SkipReason, SkippedTicker};

/// 概要中展示的最高/最低夏普代码数量
const SUMMARY_TOP_N: usize = 5;

/// 批次汇总：成功/跳过数量、夏普最高与最低的代码、跳过原因统计
pub fn format_summary(table: &MetricsTable, total: usize, skipped: &[SkippedTicker]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Sharpe Ratio vs Return Summary ===");
    let _ = writeln!(
        out,
        "Collected {} of {} tickers ({} skipped)",
        table.len(),
        total,
        skipped.len()
    );

    let mut by_sharpe: Vec<&TickerMetrics> = table.iter().collect();
    by_sharpe.sort_by(|a, b| b.sharpe_ratio().total_cmp(&a.sharpe_ratio()));

    let _ = writeln!(out, "\nTop {} by Sharpe ratio:", SUMMARY_TOP_N.min(table.len()));
    for row in by_sharpe.iter().take(SUMMARY_TOP_N) {
        let _ = writeln!(out, "{}", format_row(row));
    }

    if table.len() > SUMMARY_TOP_N {
        let _ = writeln!(
            out,
            "\nBottom {} by Sharpe ratio:",
            SUMMARY_TOP_N.min(table.len() - SUMMARY_TOP_N)
        );
        let bottom = by_sharpe.iter().rev().take(table.len() - SUMMARY_TOP_N).take(SUMMARY_TOP_N);
        for row in bottom {
            let _ = writeln!(out, "{}", format_row(row));
        }
    }

    if !skipped.is_empty() {
        let mut reasons: BTreeMap<&'static str, usize> = BTreeMap::new();
        for s in skipped {
            *reasons.entry(reason_kind(&s.reason)).or_default() += 1;
        }
        let _ = writeln!(out, "\nSkipped:");
        for (kind, count) in reasons {
            let _ = writeln!(out, "  {:<20} {}", kind, count);
        }
    }
    out
}

pub fn print_summary(table: &MetricsTable, total: usize, skipped: &[SkippedTicker]) {
    println!("{}", format_summary(table, total, skipped));
}

fn format_row(row: &TickerMetrics) -> String {
    format!(
        "  {:<8} return={:>8.2}%  vol={:>7.2}%  sharpe={:>6.2}  market_cap={}",
        row.symbol(),
        row.average_return() * 100.0,
        row.volatility() * 100.0,
        row.sharpe_ratio(),
        row.market_cap_label()
    )
}

fn reason_kind(reason: &SkipReason) -> &'static str {
    match reason {
        SkipReason::InvalidSymbol => "invalid symbol",
        SkipReason::Duplicate => "duplicate",
        SkipReason::NoHistoricalData => "no historical data",
        SkipReason::InsufficientData { .. } => "insufficient data",
        SkipReason::MalformedResponse(_) => "malformed response",
        SkipReason::Provider(_) => "provider error",
        SkipReason::Timeout(_) => "timeout",
        SkipReason::Cancelled => "cancelled",
    }
}

/// 单个持仓的风险报告：波动率和收益按百分比，夏普保留两位小数
pub fn format_risk_report(symbol: &str, metrics: &RiskMetrics, excess_sharpe: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n--- Risk Report: {} ---", symbol);
    let _ = writeln!(out, "  > Volatility: {:.2}%", metrics.volatility * 100.0);
    let _ = writeln!(out, "  > Average Return: {:.2}%", metrics.average_return * 100.0);
    let _ = writeln!(out, "  > Sharpe Ratio: {:.2}", metrics.sharpe_ratio);
    let _ = write!(out, "  > Excess Sharpe Ratio: {:.2}", excess_sharpe);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn row(symbol: &str, cap: f64, sharpe: f64) -> TickerMetrics {
        TickerMetrics::new(
            symbol,
            Some(cap),
            RiskMetrics {
                average_return: sharpe * 0.2,
                volatility: 0.2,
                sharpe_ratio: sharpe,
            },
        )
    }

    #[test]
    fn test_format_summary() {
        let table = MetricsTable::from_records(vec![
            row("AAPL", 3.0e12, 1.5),
            row("MSFT", 2.9e12, 0.8),
            row("TSLA", 8.0e11, -0.4),
        ])
        .unwrap();
        let skipped = vec![
            SkippedTicker::new("XYZ", SkipReason::NoHistoricalData),
            SkippedTicker::new("SLOW", SkipReason::Timeout(Duration::from_secs(15))),
            SkippedTicker::new("NOPE", SkipReason::NoHistoricalData),
        ];

        let text = format_summary(&table, 6, &skipped);
        assert!(text.contains("Collected 3 of 6 tickers (3 skipped)"));
        assert!(text.contains("Top 3 by Sharpe ratio:"));
        assert!(!text.contains("Bottom"));
        let aapl = text.find("AAPL").unwrap();
        let tsla = text.find("TSLA").unwrap();
        assert!(aapl < tsla);
        assert!(text.contains("no historical data   2"));
        assert!(text.contains("timeout              1"));
    }

    #[test]
    fn test_format_risk_report() {
        let metrics = RiskMetrics {
            average_return: 0.1234,
            volatility: 0.25,
            sharpe_ratio: 0.4936,
        };
        let text = format_risk_report("AAPL", &metrics, 0.45);
        assert!(text.contains("--- Risk Report: AAPL ---"));
        assert!(text.contains("Volatility: 25.00%"));
        assert!(text.contains("Average Return: 12.34%"));
        assert!(text.contains("Sharpe Ratio: 0.49"));
        assert!(text.contains("Excess Sharpe Ratio: 0.45"));
    }
}
