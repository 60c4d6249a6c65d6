pub mod app;
pub mod app_config;
pub mod error;
pub mod trading;

use tracing::info;

/// 加载 .env 并初始化日志
pub async fn app_init() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    app_config::log::setup_logging().await?;
    info!("sharpe_scan 初始化完成");
    Ok(())
}
