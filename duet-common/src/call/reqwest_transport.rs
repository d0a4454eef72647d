use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::CONTENT_TYPE;

use crate::call::transport::{HttpRequest, RawResponse, Transport, is_bodiless};
use crate::converter::Body;
use crate::error::{DuetError, Result};
use crate::header::ContentType;

/// 代理协议
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    Http,
    Socks5,
}

impl ProxyType {
    /// 从地址的协议前缀推断，没有可识别的前缀时返回 None
    pub fn infer(url: &str) -> Option<Self> {
        let (scheme, _) = url.trim().split_once("://")?;
        match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Some(ProxyType::Http),
            "socks5" | "socks5h" => Some(ProxyType::Socks5),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Http => "http",
            ProxyType::Socks5 => "socks5",
        }
    }
}

impl FromStr for ProxyType {
    type Err = DuetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(ProxyType::Http),
            "socks5" => Ok(ProxyType::Socks5),
            other => Err(DuetError::invalid_argument(format!(
                "Unsupported proxy type '{}', expected 'http' or 'socks5'",
                other
            ))),
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 代理设置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub url: String,
    pub proxy_type: Option<ProxyType>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// 逗号分隔的直连域名列表
    pub no_proxy: Option<String>,
}

impl ProxySettings {
    pub fn new(url: impl Into<String>) -> Self {
        ProxySettings {
            url: url.into(),
            proxy_type: None,
            username: None,
            password: None,
            no_proxy: None,
        }
    }

    /// 代理类型，未显式指定时从 URL 推断，推断不出时按 HTTP 处理
    pub fn effective_type(&self) -> ProxyType {
        self.proxy_type
            .or_else(|| ProxyType::infer(&self.url))
            .unwrap_or(ProxyType::Http)
    }

    /// 带协议前缀的代理地址
    fn target(&self) -> String {
        if self.url.contains("://") {
            return self.url.clone();
        }
        format!("{}://{}", self.effective_type().as_str(), self.url)
    }

    fn to_proxy(&self) -> Result<reqwest::Proxy> {
        let target = self.target();
        let mut proxy = reqwest::Proxy::all(&target).map_err(|e| {
            DuetError::invalid_argument(format!("Invalid proxy url '{}': {}", target, e))
        })?;
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            proxy = proxy.basic_auth(username, password);
        }
        if let Some(no_proxy) = &self.no_proxy {
            proxy = proxy.no_proxy(reqwest::NoProxy::from_string(no_proxy));
        }
        Ok(proxy)
    }
}

/// 传输层配置
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    pub timeout: Option<Duration>,
    pub proxy: Option<ProxySettings>,
    /// 明确禁用代理（包括系统代理）
    pub no_proxy: bool,
    /// 信任所有证书，仅用于测试环境
    pub accept_invalid_certs: bool,
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = Some(proxy);
        self.no_proxy = false;
        self
    }

    pub fn disable_proxy(mut self) -> Self {
        self.proxy = None;
        self.no_proxy = true;
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// 基于阻塞 `reqwest` 客户端的传输层
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_config(&TransportConfig::default())
    }

    pub fn with_config(config: &TransportConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if config.accept_invalid_certs {
            log::warn!("TLS certificate validation is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        if config.no_proxy {
            builder = builder.no_proxy();
        } else if let Some(proxy) = &config.proxy {
            log::debug!("Using {} proxy {}", proxy.effective_type(), proxy.url);
            builder = builder.proxy(proxy.to_proxy()?);
        }
        let client = builder.build().map_err(|e| {
            DuetError::invalid_argument(format!("Unable to build HTTP client: {}", e))
        })?;
        Ok(ReqwestTransport { client })
    }

    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        ReqwestTransport { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> anyhow::Result<RawResponse> {
        let HttpRequest {
            method,
            url,
            mut headers,
            body,
        } = request;
        let endpoint = format!("{} {}", method, url);

        let mut builder = self.client.request(method.clone(), url);
        if let Some(body) = body {
            if !headers.contains_key(CONTENT_TYPE) {
                if let Some(value) = body.content_type().to_header_value() {
                    headers.insert(CONTENT_TYPE, value);
                }
            }
            builder = builder.body(body.into_bytes());
        }

        let response = builder
            .headers(headers)
            .send()
            .with_context(|| format!("Request failed: {}", endpoint))?;

        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .with_context(|| format!("Unable to read response body: {}", endpoint))?;

        let body = if is_bodiless(&method, status) {
            None
        } else {
            let content_type = ContentType::from_header(headers.get(CONTENT_TYPE));
            Some(Body::new(content_type, bytes.to_vec()))
        };

        Ok(RawResponse {
            url,
            status,
            message: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}
