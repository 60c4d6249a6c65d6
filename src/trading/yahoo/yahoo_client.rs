use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{AppResult, ProviderError};

/// 桌面浏览器 UA，Yahoo 与 Wikipedia 会拒绝默认的 reqwest UA
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// 访问后下发会话 cookie 的地址，quote 接口需要该 cookie 与 crumb
pub const DEFAULT_YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";

const CRUMB_PATH: &str = "/v1/test/getcrumb";

#[derive(Debug, Clone)]
pub struct YahooClientConfig {
    pub base_url: String,
    pub cookie_url: String,
    /// 单次 HTTP 请求超时
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl YahooClientConfig {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            cookie_url: DEFAULT_YAHOO_COOKIE_URL.to_string(),
            request_timeout,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }

    pub fn with_cookie_url(mut self, cookie_url: impl Into<String>) -> Self {
        self.cookie_url = cookie_url.into();
        self
    }
}

/// Yahoo Finance HTTP 客户端
///
/// 显式构造后交给数据服务持有，不使用全局单例
#[derive(Debug, Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    cookie_url: String,
    /// 会话 crumb，首次请求 quote 时获取，克隆的客户端共享
    crumb: Arc<RwLock<Option<String>>>,
}

impl YahooClient {
    pub fn new(config: YahooClientConfig) -> AppResult<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_url: config.cookie_url,
            crumb: Arc::new(RwLock::new(None)),
        })
    }

    /// 发送 GET 请求并把响应体反序列化为 `T`
    pub(crate) async fn send_request<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ProviderError> {
        self.send_query(path, &[]).await
    }

    /// 同 `send_request`，查询参数由 reqwest 负责编码
    pub(crate) async fn send_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;

        let status_code = response.status();
        let response_body = response.text().await?;
        debug!(
            "path:{}, status:{}, yahoo_response_bytes: {}",
            path,
            status_code,
            response_body.len()
        );

        match status_code {
            StatusCode::OK => Ok(serde_json::from_str(&response_body)?),
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
            StatusCode::NOT_FOUND => Err(ProviderError::NotFound(
                error_description(&response_body).unwrap_or_else(|| path.to_string()),
            )),
            status => Err(ProviderError::Http {
                status: status.as_u16(),
                message: error_description(&response_body)
                    .unwrap_or_else(|| truncate(&response_body, 200)),
            }),
        }
    }
}

impl YahooClient {
    /// 取得会话 crumb，已缓存则直接返回
    ///
    /// 先访问 cookie 地址让 cookie jar 记录会话 cookie，再带着 cookie 请求 crumb
    pub(crate) async fn crumb(&self) -> Result<String, ProviderError> {
        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(crumb.clone());
        }

        let mut cached = self.crumb.write().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // 该地址通常返回 404，只需要响应中的 Set-Cookie
        let response = self.client.get(&self.cookie_url).send().await?;
        debug!("cookie_url:{}, status:{}", self.cookie_url, response.status());

        let url = format!("{}{}", self.base_url, CRUMB_PATH);
        let response = self.client.get(&url).send().await?;
        let status_code = response.status();
        let body = response.text().await?;

        match status_code {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            status => {
                return Err(ProviderError::Http {
                    status: status.as_u16(),
                    message: truncate(&body, 200),
                })
            }
        }

        let crumb = body.trim();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(ProviderError::Malformed(format!(
                "crumb 响应无效: {}",
                truncate(crumb, 50)
            )));
        }
        debug!("获取 crumb 成功");
        *cached = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    /// 丢弃缓存的 crumb，下一次请求重新握手
    pub(crate) async fn invalidate_crumb(&self) {
        *self.crumb.write().await = None;
    }
}

// 提取 {"chart": {"error": {"description": ...}}} 一类结构中的错误描述
fn error_description(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    object.values().find_map(|section| {
        section
            .get("error")
            .and_then(|e| e.get("description"))
            .and_then(|d| d.as_str())
            .map(|d| d.to_string())
    })
}

fn truncate(body: &str, max_len: usize) -> String {
    if body.len() <= max_len {
        return body.to_string();
    }
    // 在字符边界截断，避免切断多字节字符
    let mut end = max_len;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
