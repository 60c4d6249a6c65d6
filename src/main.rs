use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use sharpe_scan::app;
use sharpe_scan::app_config::{OutputPaths, ScanConfig};
use sharpe_scan::trading::model::{Holding, Portfolio};

#[derive(Parser)]
#[command(name = "sharpe_scan")]
#[command(about = "S&P 500 Sharpe ratio vs annualized return scanner", long_about = None)]
struct Cli {
    /// 只处理前 N 个代码
    #[arg(long)]
    limit: Option<usize>,

    /// 最大并发请求数
    #[arg(long)]
    concurrency: Option<usize>,

    /// 直接指定代码列表，跳过成分股抓取
    #[arg(long, value_delimiter = ',')]
    tickers: Vec<String>,

    /// 输出目录
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 输出持仓组合的风险报告
    Portfolio {
        /// 持仓，格式 SYM=QTY，可重复；缺省为 AAPL=10 GOOGL=5 TSLA=5
        #[arg(long = "holding")]
        holdings: Vec<Holding>,
    },
}

impl Cli {
    fn apply(&self, config: &mut ScanConfig) {
        if let Some(limit) = self.limit {
            config.limit = Some(limit);
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if !self.tickers.is_empty() {
            config.tickers = self.tickers.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output = OutputPaths::in_dir(dir);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    sharpe_scan::app_init().await?;

    let mut config = ScanConfig::from_env()?;
    cli.apply(&mut config);
    config.validate()?;

    match &cli.command {
        Some(Commands::Portfolio { holdings }) => {
            let portfolio = if holdings.is_empty() {
                Portfolio::sample()
            } else {
                Portfolio::from_holdings(holdings)
            };
            app::run_portfolio(&config, &portfolio).await
        }
        None => {
            let cancel = CancellationToken::new();
            let listener = app::spawn_shutdown_listener(cancel.clone());
            let result = app::run_scan(&config, cancel).await;
            listener.abort();
            result
        }
    }
}
