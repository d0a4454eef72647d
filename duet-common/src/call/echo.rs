use anyhow::Context;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};

use crate::call::transport::{HttpRequest, RawResponse, Transport, is_bodiless};
use crate::converter::Body;
use crate::header::ContentType;

/// 回显传输层，用于测试
///
/// 把请求体和它的 Content-Type 原样作为响应返回，请求头也一并回显。
/// 状态码取自查询参数 `status`，缺省为 200；204 没有响应体，504 返回空响应体。
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoTransport;

impl EchoTransport {
    pub const MESSAGE: &'static str = "Mocked response";
}

impl Transport for EchoTransport {
    fn execute(&self, request: HttpRequest) -> anyhow::Result<RawResponse> {
        let status = match request.url.query_pairs().find(|(key, _)| key == "status") {
            Some((_, code)) => {
                let code: u16 = code
                    .parse()
                    .with_context(|| format!("Invalid status query parameter '{}'", code))?;
                StatusCode::from_u16(code)
                    .with_context(|| format!("Invalid status query parameter '{}'", code))?
            }
            None => StatusCode::OK,
        };

        let content_type = match request.content_type() {
            content_type if content_type.is_null() => ContentType::TEXT_PLAIN,
            content_type => content_type,
        };
        let mut headers = request.headers.clone();

        let body = if is_bodiless(&request.method, status) {
            None
        } else if status == StatusCode::GATEWAY_TIMEOUT {
            Some(Body::new(content_type.clone(), Vec::new()))
        } else {
            let bytes = request.body.map(Body::into_bytes).unwrap_or_default();
            headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
            Some(Body::new(content_type.clone(), bytes))
        };
        if let Some(value) = content_type.to_header_value() {
            headers.insert(CONTENT_TYPE, value);
        }

        log::debug!("Echo {} {} -> {}", request.method, request.url, status);
        Ok(RawResponse {
            url: request.url,
            status,
            message: Self::MESSAGE.to_string(),
            headers,
            body,
        })
    }
}
