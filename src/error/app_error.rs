use std::time::Duration;

use thiserror::Error;

/// 应用错误
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 成分股列表获取失败
    #[error("成分股列表获取失败: {0}")]
    UniverseError(String),

    /// HTTP 客户端构建失败
    #[error("HTTP客户端初始化失败: {0}")]
    HttpClientError(#[from] reqwest::Error),

    /// 整个批次没有任何有效数据
    #[error("未收集到任何有效的股票数据")]
    EmptyResult,

    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV错误: {0}")]
    CsvError(#[from] csv::Error),

    #[error("序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// 行情数据提供方错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// 网络层失败（连接、DNS、读取响应体等）
    #[error("网络请求失败: {0}")]
    Transport(String),

    /// 单次请求超时
    #[error("请求超时")]
    Timeout,

    /// 被限流 (HTTP 429)
    #[error("请求被限流")]
    RateLimited,

    /// 非 2xx 状态码
    #[error("HTTP状态异常: {status} {message}")]
    Http { status: u16, message: String },

    /// 代码不存在或已退市
    #[error("代码不存在: {0}")]
    NotFound(String),

    /// 响应结构无法解析
    #[error("响应格式错误: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// 是否为可重试的瞬时错误
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::Timeout | ProviderError::RateLimited => {
                true
            }
            ProviderError::Http { status, .. } => *status >= 500,
            ProviderError::NotFound(_) | ProviderError::Malformed(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Malformed(err.to_string())
    }
}

/// 风险指标计算错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// 价格点不足以计算收益率（至少需要2个）
    #[error("数据不足: 需要至少2个价格点, 实际 {points} 个")]
    InsufficientData { points: usize },

    /// 收盘价非正或非有限值
    #[error("无效价格: 第 {index} 个收盘价为 {price}")]
    InvalidPrice { index: usize, price: f64 },

    /// 计算结果出现 NaN / inf
    #[error("计算结果非有限值: {0}")]
    NonFinite(&'static str),
}

/// 把超时时长格式化为便于日志阅读的字符串
pub(crate) fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_millis() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{}ms", timeout.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Timeout.is_transient());
        assert!(ProviderError::RateLimited.is_transient());
        assert!(ProviderError::Transport("reset".into()).is_transient());
        assert!(ProviderError::Http {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!ProviderError::Http {
            status: 401,
            message: String::new()
        }
        .is_transient());
        assert!(!ProviderError::NotFound("INVALID_XYZ".into()).is_transient());
        assert!(!ProviderError::Malformed("eof".into()).is_transient());
    }

    #[test]
    fn test_format_timeout() {
        assert_eq!(format_timeout(Duration::from_secs(15)), "15s");
        assert_eq!(format_timeout(Duration::from_millis(250)), "250ms");
    }
}
