use reqwest::header::HeaderMap;

use crate::call::{HttpRequest, RawResponse};
use crate::converter::Body;
use crate::interceptor::DuetInterceptor;

/// 日志拦截器，以 info 级别记录请求与响应，以 error 级别记录失败
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor;

impl DuetInterceptor for LoggingInterceptor {
    fn before_request(&self, request: HttpRequest) -> anyhow::Result<HttpRequest> {
        log::info!(
            "REQUEST:\n{} {}\nHeaders:\n{}Body:\n{}",
            request.method,
            request.url,
            format_headers(&request.headers),
            format_body(request.body.as_ref())
        );
        Ok(request)
    }

    fn after_response(&self, response: RawResponse) -> anyhow::Result<RawResponse> {
        log::info!(
            "RESPONSE:\n{} {}\n{}\nHeaders:\n{}Body:\n{}",
            response.status.as_u16(),
            response.message,
            response.url,
            format_headers(&response.headers),
            format_body(response.body.as_ref())
        );
        Ok(response)
    }

    fn on_error(&self, endpoint: &str, error: &anyhow::Error) {
        log::error!("Failed to make API call: {}\n{:#}", endpoint, error);
    }
}

fn format_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            format!("  {}: {}\n", name, String::from_utf8_lossy(value.as_bytes()))
        })
        .collect()
}

fn format_body(body: Option<&Body>) -> String {
    match body {
        None => "<absent>".to_string(),
        Some(body) if body.is_empty() => "<no content>".to_string(),
        Some(body) => body.text().into_owned(),
    }
}
