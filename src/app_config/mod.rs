pub mod env;
pub mod log;
pub mod scan_config;

// 重新导出
pub use env::*;
pub use scan_config::{OutputPaths, ScanConfig};
