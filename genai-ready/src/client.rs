//! Client configuration and transport layer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as HttpClient, Proxy};

use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
const DEFAULT_API_VERSION: &str = "v1beta";

/// Gemini 客户端。
///
/// 显式构造并按值传递；克隆共享同一个底层 HTTP 连接池。
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub http: HttpClient,
    pub config: ClientConfig,
    pub api_client: ApiClient,
}

/// 客户端配置。
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API 密钥。
    pub api_key: String,
    /// HTTP 配置。
    pub http_options: HttpOptions,
}

/// HTTP 配置。
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub headers: HashMap<String, String>,
    pub base_url: Option<String>,
    pub api_version: Option<String>,
}

impl Client {
    /// 创建新客户端。
    ///
    /// # Errors
    /// 当配置无效或构建客户端失败时返回错误。
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    /// 从环境变量创建客户端。
    ///
    /// # Errors
    /// 当环境变量缺失或构建客户端失败时返回错误。
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .map_err(|_| Error::InvalidConfig {
                message: "GEMINI_API_KEY or GOOGLE_API_KEY not found".into(),
            })?;
        let mut builder = Self::builder().api_key(api_key);
        if let Ok(base_url) =
            std::env::var("GENAI_BASE_URL").or_else(|_| std::env::var("GEMINI_BASE_URL"))
        {
            if !base_url.trim().is_empty() {
                builder = builder.base_url(base_url);
            }
        }
        if let Ok(api_version) = std::env::var("GENAI_API_VERSION") {
            if !api_version.trim().is_empty() {
                builder = builder.api_version(api_version);
            }
        }
        builder.build()
    }

    /// 创建 Builder。
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// 当前客户端配置。
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// 访问 Files API。
    #[must_use]
    pub fn files(&self) -> crate::files::Files {
        crate::files::Files::new(self.inner.clone())
    }

    /// 访问 Operations API。
    #[must_use]
    pub fn operations(&self) -> crate::operations::Operations {
        crate::operations::Operations::new(self.inner.clone())
    }
}

/// 客户端 Builder。
#[derive(Default)]
pub struct ClientBuilder {
    api_key: Option<String>,
    http_options: HttpOptions,
}

impl ClientBuilder {
    /// 设置 API Key。
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// 设置请求超时（秒）。
    #[must_use]
    pub const fn timeout(mut self, secs: u64) -> Self {
        self.http_options.timeout = Some(secs);
        self
    }

    /// 设置代理。
    #[must_use]
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.http_options.proxy = Some(url.into());
        self
    }

    /// 增加默认 HTTP 头。
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http_options.headers.insert(key.into(), value.into());
        self
    }

    /// 设置自定义基础 URL。
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http_options.base_url = Some(base_url.into());
        self
    }

    /// 设置 API 版本。
    #[must_use]
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.http_options.api_version = Some(api_version.into());
        self
    }

    /// 构建客户端。
    ///
    /// # Errors
    /// 当缺少 API Key、参数无效或构建 HTTP 客户端失败时返回错误。
    pub fn build(self) -> Result<Client> {
        let Self {
            api_key,
            http_options,
        } = self;

        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig {
                message: "API key required for Gemini API".into(),
            })?;
        let headers = Self::build_headers(&http_options, &api_key)?;
        let http = Self::build_http_client(&http_options, headers)?;

        let config = ClientConfig {
            api_key,
            http_options,
        };
        let api_client = ApiClient::new(&config);

        Ok(Client {
            inner: Arc::new(ClientInner {
                http,
                config,
                api_client,
            }),
        })
    }

    fn build_headers(http_options: &HttpOptions, api_key: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in &http_options.headers {
            let name =
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| Error::InvalidConfig {
                    message: format!("Invalid header name: {key}"),
                })?;
            let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidConfig {
                message: format!("Invalid header value for {key}"),
            })?;
            headers.insert(name, value);
        }

        let header_name = HeaderName::from_static("x-goog-api-key");
        if !headers.contains_key(&header_name) {
            let mut header_value =
                HeaderValue::from_str(api_key).map_err(|_| Error::InvalidConfig {
                    message: "Invalid API key value".into(),
                })?;
            header_value.set_sensitive(true);
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }

    fn build_http_client(http_options: &HttpOptions, headers: HeaderMap) -> Result<HttpClient> {
        let mut http_builder = HttpClient::builder();
        if let Some(timeout) = http_options.timeout {
            http_builder = http_builder.timeout(Duration::from_secs(timeout));
        }

        if let Some(proxy_url) = &http_options.proxy {
            let proxy = Proxy::all(proxy_url).map_err(|e| Error::InvalidConfig {
                message: format!("Invalid proxy: {e}"),
            })?;
            http_builder = http_builder.proxy(proxy);
        }

        if !headers.is_empty() {
            http_builder = http_builder.default_headers(headers);
        }

        Ok(http_builder.build()?)
    }
}

impl ClientInner {
    /// 发送请求。
    ///
    /// # Errors
    /// 当请求构建或网络请求失败时返回错误。
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let request = request.build()?;
        tracing::trace!(method = %request.method(), url = %request.url(), "sending request");
        Ok(self.http.execute(request).await?)
    }

    /// 发送请求并将非 2xx 响应转换为 [`Error::ApiError`]。
    pub async fn send_checked(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(Error::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response)
    }
}

pub(crate) struct ApiClient {
    pub base_url: String,
    pub api_version: String,
}

impl ApiClient {
    /// 创建 API 客户端配置。
    pub fn new(config: &ClientConfig) -> Self {
        let base_url = config
            .http_options
            .base_url
            .as_deref()
            .map_or_else(|| DEFAULT_BASE_URL.to_string(), normalize_base_url);
        let api_version = config
            .http_options
            .api_version
            .clone()
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Self {
            base_url,
            api_version,
        }
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let mut value = base_url.trim().to_string();
    if !value.ends_with('/') {
        value.push('/');
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::with_env;

    #[test]
    fn test_client_from_api_key() {
        let client = Client::new("test-api-key").unwrap();
        assert_eq!(client.inner.config.api_key, "test-api-key");
        assert_eq!(
            client.inner.api_client.base_url,
            "https://generativelanguage.googleapis.com/"
        );
        assert_eq!(client.inner.api_client.api_version, "v1beta");
    }

    #[test]
    fn test_client_builder() {
        let client = Client::builder()
            .api_key("test-key")
            .timeout(30)
            .build()
            .unwrap();
        assert_eq!(client.config().http_options.timeout, Some(30));
    }

    #[test]
    fn test_base_url_normalization() {
        let client = Client::builder()
            .api_key("test-key")
            .base_url("https://example.com")
            .build()
            .unwrap();
        assert_eq!(client.inner.api_client.base_url, "https://example.com/");
    }

    #[test]
    fn test_from_env_reads_overrides() {
        with_env(
            &[
                ("GEMINI_API_KEY", Some("env-key")),
                ("GENAI_BASE_URL", Some("https://env.example.com")),
                ("GENAI_API_VERSION", Some("v99")),
                ("GOOGLE_API_KEY", None),
            ],
            || {
                let client = Client::from_env().unwrap();
                assert_eq!(client.inner.api_client.base_url, "https://env.example.com/");
                assert_eq!(client.inner.api_client.api_version, "v99");
            },
        );
    }

    #[test]
    fn test_from_env_ignores_empty_overrides() {
        with_env(
            &[
                ("GEMINI_API_KEY", Some("env-key")),
                ("GENAI_BASE_URL", Some("   ")),
                ("GEMINI_BASE_URL", None),
                ("GENAI_API_VERSION", Some("")),
                ("GOOGLE_API_KEY", None),
            ],
            || {
                let client = Client::from_env().unwrap();
                assert_eq!(
                    client.inner.api_client.base_url,
                    "https://generativelanguage.googleapis.com/"
                );
                assert_eq!(client.inner.api_client.api_version, "v1beta");
            },
        );
    }

    #[test]
    fn test_from_env_missing_key_errors() {
        with_env(
            &[
                ("GEMINI_API_KEY", None),
                ("GOOGLE_API_KEY", None),
                ("GENAI_BASE_URL", None),
            ],
            || {
                let result = Client::from_env();
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn test_from_env_google_api_key_fallback() {
        with_env(
            &[
                ("GEMINI_API_KEY", None),
                ("GOOGLE_API_KEY", Some("google-key")),
                ("GENAI_BASE_URL", None),
                ("GEMINI_BASE_URL", None),
            ],
            || {
                let client = Client::from_env().unwrap();
                assert_eq!(client.inner.config.api_key, "google-key");
            },
        );
    }

    #[test]
    fn test_valid_proxy_is_accepted() {
        let client = Client::builder()
            .api_key("test-key")
            .proxy("http://127.0.0.1:8888")
            .build();
        assert!(client.is_ok());
    }

    #[test]
    fn test_missing_api_key_errors() {
        let result = Client::builder().build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));

        let result = Client::builder().api_key("  ").build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let result = Client::builder()
            .api_key("test-key")
            .header("bad header", "value")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let result = Client::builder()
            .api_key("test-key")
            .header("x-test", "bad\nvalue")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_api_key_value_is_rejected() {
        let err = Client::builder().api_key("bad\nkey").build().err().unwrap();
        assert!(
            matches!(err, Error::InvalidConfig { message } if message.contains("Invalid API key value"))
        );
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let result = Client::builder()
            .api_key("test-key")
            .proxy("not a url")
            .build();
        assert!(result.is_err());
    }
}
