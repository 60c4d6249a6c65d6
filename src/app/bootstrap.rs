use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::app_config::ScanConfig;
use crate::error::{AppError, AppResult};
use crate::trading::indicator::risk_metrics;
use crate::trading::model::Portfolio;
use crate::trading::report::{self, ScatterPlot};
use crate::trading::services::TickerMetricsService;
use crate::trading::task::{log_progress, MetricsJob};
use crate::trading::universe::{self, UniverseClient};
use crate::trading::yahoo::{YahooClient, YahooClientConfig};

/// 构造 Yahoo 数据源与代码服务
pub fn build_service(config: &ScanConfig) -> AppResult<TickerMetricsService> {
    let client = YahooClient::new(
        YahooClientConfig::new(config.yahoo_base_url.clone(), config.fetch_timeout)
            .with_cookie_url(config.yahoo_cookie_url.clone()),
    )?;
    Ok(TickerMetricsService::from_config(Arc::new(client), config))
}

/// 待扫描的代码列表：优先使用 TICKERS，否则抓取成分股并写出列表文件
pub async fn resolve_symbols(config: &ScanConfig) -> AppResult<Vec<String>> {
    let mut symbols = if !config.tickers.is_empty() {
        info!("使用 TICKERS 指定的 {} 个代码", config.tickers.len());
        config.tickers.clone()
    } else {
        let client = UniverseClient::from_config(config)?;
        let constituents = client.fetch_constituents().await?;
        if let Err(e) = universe::write_listing(&config.output.listing, &constituents) {
            warn!("成分股列表写入失败: {}", e);
        }
        constituents.into_iter().map(|c| c.symbol).collect()
    };

    if let Some(limit) = config.limit {
        symbols.truncate(limit);
    }
    Ok(symbols)
}

/// 完整流程：代码列表 -> 并发采集 -> 排序 -> 散点图 / CSV / 控制台汇总
pub async fn run_scan(config: &ScanConfig, cancel: CancellationToken) -> anyhow::Result<()> {
    let symbols = match resolve_symbols(config).await {
        Ok(symbols) => symbols,
        Err(e) => {
            error!("{}", e);
            Vec::new()
        }
    };

    let job = MetricsJob::new(build_service(config)?, config.concurrency).with_cancel_token(cancel);
    let batch = job.collect(&symbols, log_progress).await;

    let total = batch.total();
    let skipped = batch.skipped().to_vec();
    let table = match batch.into_table() {
        Ok(table) => table,
        Err(AppError::EmptyResult) => {
            warn!("No valid ticker data collected, aborting plot.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(dir) = config.output.plot.parent() {
        fs::create_dir_all(dir)?;
    }
    ScatterPlot::default()
        .with_label_top_n(config.label_top_n)
        .save(&config.output.plot, &table)?;
    report::save_csv(&config.output.csv, &table)?;
    report::print_summary(&table, total, &skipped);
    Ok(())
}

/// 组合风险报告：逐个持仓输出波动率、收益、夏普，最后输出按最新收盘价计算的总市值
pub async fn run_portfolio(config: &ScanConfig, portfolio: &Portfolio) -> anyhow::Result<()> {
    let service = build_service(config)?;
    let mut last_prices = HashMap::new();

    for symbol in portfolio.symbols() {
        let series = match service.fetch_series(symbol).await {
            Ok(series) => series,
            Err(reason) => {
                warn!("  - Skipping {}: {}", symbol, reason);
                continue;
            }
        };

        let metrics = match risk_metrics::calculate(&series) {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!("  - Skipping {}: {}", symbol, e);
                continue;
            }
        };
        let excess = risk_metrics::excess_sharpe_ratio(&series, config.risk_free_rate)?;
        println!("{}", report::format_risk_report(symbol, &metrics, excess));

        if let Some(last) = series.last() {
            last_prices.insert(symbol.to_string(), last.close);
        }
    }

    println!(
        "\nPortfolio value (last close): {:.2}",
        portfolio.calculate_total_value(&last_prices)
    );
    Ok(())
}

/// 收到退出信号时取消令牌，未完成的代码以 `Cancelled` 结束
pub fn spawn_shutdown_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(signal_name) => {
                warn!("接收到 {} 信号，取消剩余任务...", signal_name);
                cancel.cancel();
            }
            Err(e) => error!("注册退出信号失败: {}", e),
        }
    })
}

async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        Ok(name)
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        Ok("CTRL+C")
    }
}
