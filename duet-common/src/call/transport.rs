use std::fmt;

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode, Url};

use crate::converter::Body;
use crate::header::ContentType;

/// 传输层：执行一次准备好的请求并返回原始响应
///
/// 连接、TLS、重定向都属于传输层；失败以 `anyhow::Error` 返回，
/// 由调用适配器包装为 `HttpCall` 错误。
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> anyhow::Result<RawResponse>;
}

/// 准备发送的请求
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        HttpRequest {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// 请求体的 Content-Type，优先取消息体自身声明的类型
    pub fn content_type(&self) -> ContentType {
        match &self.body {
            Some(body) if !body.content_type().is_null() => body.content_type().clone(),
            _ => ContentType::from_header(self.headers.get(CONTENT_TYPE)),
        }
    }

    /// `METHOD url` 形式的简短描述
    pub fn endpoint(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// 传输层返回的原始响应
///
/// `body` 为 `None` 表示响应没有消息体（如 204、304 或 HEAD 请求），
/// 与存在但为空的消息体区分开。
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub url: Url,
    pub status: StatusCode,
    pub message: String,
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

impl RawResponse {
    /// 使用状态码的标准描述作为状态信息
    pub fn new(url: Url, status: StatusCode) -> Self {
        RawResponse {
            url,
            status,
            message: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// 状态码是否在 [200, 299] 范围内
    pub fn is_successful(&self) -> bool {
        self.status.is_success()
    }

    /// 响应的 Content-Type，优先取消息体声明的类型
    pub fn content_type(&self) -> ContentType {
        match &self.body {
            Some(body) if !body.content_type().is_null() => body.content_type().clone(),
            _ => ContentType::from_header(self.headers.get(CONTENT_TYPE)),
        }
    }
}

/// 判断某个响应是否不应该带消息体
pub fn is_bodiless(method: &Method, status: StatusCode) -> bool {
    *method == Method::HEAD
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::RESET_CONTENT
        || status == StatusCode::NOT_MODIFIED
        || status.is_informational()
}
