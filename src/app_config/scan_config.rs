//! 扫描任务配置
//!
//! 全部来自环境变量（可由 .env 提供），命令行参数可覆盖其中一部分

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_config::env::{env_f64, env_list, env_opt_usize, env_or_default, env_u64, env_usize};
use crate::error::{AppError, AppResult};
use crate::trading::model::LookbackRange;
use crate::trading::yahoo::DEFAULT_YAHOO_COOKIE_URL;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_SP500_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";

/// 固定输出文件名
pub const LISTING_FILE_NAME: &str = "sp500_info.txt";
pub const PLOT_FILE_NAME: &str = "sp500_sharpe_vs_return.svg";
pub const CSV_FILE_NAME: &str = "sp500_sharpe_vs_return.csv";

/// 输出文件路径
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub listing: PathBuf,
    pub plot: PathBuf,
    pub csv: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            listing: dir.join(LISTING_FILE_NAME),
            plot: dir.join(PLOT_FILE_NAME),
            csv: dir.join(CSV_FILE_NAME),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 最大并发请求数
    pub concurrency: usize,
    /// 单个代码的整体超时
    pub fetch_timeout: Duration,
    /// 瞬时错误的最大重试次数（不含首次请求）
    pub max_retries: usize,
    /// 指数退避的基础间隔
    pub retry_base_delay: Duration,
    pub lookback: LookbackRange,
    /// 只处理前 N 个代码，便于快速测试
    pub limit: Option<usize>,
    /// 非空时跳过成分股抓取，直接使用该列表
    pub tickers: Vec<String>,
    pub yahoo_base_url: String,
    /// 下发会话 cookie 的地址（市值接口的 crumb 握手用）
    pub yahoo_cookie_url: String,
    pub universe_url: String,
    pub universe_timeout: Duration,
    pub output: OutputPaths,
    /// 图中标注代码的数量（按市值取前 N）
    pub label_top_n: usize,
    /// 组合报告使用的年化无风险利率
    pub risk_free_rate: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 20,
            fetch_timeout: Duration::from_secs(15),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(200),
            lookback: LookbackRange::OneYear,
            limit: None,
            tickers: Vec::new(),
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            yahoo_cookie_url: DEFAULT_YAHOO_COOKIE_URL.to_string(),
            universe_url: DEFAULT_SP500_URL.to_string(),
            universe_timeout: Duration::from_secs(15),
            output: OutputPaths::in_dir("."),
            label_top_n: 20,
            risk_free_rate: 0.01,
        }
    }
}

impl ScanConfig {
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        let lookback = env_or_default("LOOKBACK_RANGE", defaults.lookback.as_str()).parse()?;

        let config = Self {
            concurrency: env_usize("SCAN_CONCURRENCY", defaults.concurrency),
            fetch_timeout: Duration::from_secs(env_u64(
                "FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )),
            max_retries: env_usize("FETCH_MAX_RETRIES", defaults.max_retries),
            retry_base_delay: Duration::from_millis(env_u64(
                "FETCH_RETRY_BASE_MS",
                defaults.retry_base_delay.as_millis() as u64,
            )),
            lookback,
            limit: env_opt_usize("SCAN_LIMIT"),
            tickers: env_list("TICKERS"),
            yahoo_base_url: env_or_default("YAHOO_BASE_URL", DEFAULT_YAHOO_BASE_URL),
            yahoo_cookie_url: env_or_default("YAHOO_COOKIE_URL", DEFAULT_YAHOO_COOKIE_URL),
            universe_url: env_or_default("SP500_URL", DEFAULT_SP500_URL),
            universe_timeout: Duration::from_secs(env_u64(
                "UNIVERSE_TIMEOUT_SECS",
                defaults.universe_timeout.as_secs(),
            )),
            output: OutputPaths::in_dir(env_or_default("OUTPUT_DIR", ".")),
            label_top_n: env_usize("PLOT_LABEL_TOP_N", defaults.label_top_n),
            risk_free_rate: env_f64("RISK_FREE_RATE", defaults.risk_free_rate),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.concurrency == 0 {
            return Err(AppError::ConfigError("SCAN_CONCURRENCY 必须大于0".to_string()));
        }
        if self.fetch_timeout.is_zero() {
            return Err(AppError::ConfigError("FETCH_TIMEOUT_SECS 必须大于0".to_string()));
        }
        if self.universe_timeout.is_zero() {
            return Err(AppError::ConfigError("UNIVERSE_TIMEOUT_SECS 必须大于0".to_string()));
        }
        if self.limit == Some(0) {
            return Err(AppError::ConfigError("SCAN_LIMIT 必须大于0".to_string()));
        }
        Ok(())
    }
}
