use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::call::transport::{HttpRequest, Transport};
use crate::converter::{CallAnnotations, ConverterRegistry};
use crate::error::{DuetError, Result};
use crate::interceptor::InterceptorChain;
use crate::response::DualResponse;

/// 调用完成时的分支
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Error,
}

/// 一次调用所处的状态
///
/// `Pending → Executing → Completed(..) | Failed`，`Completed` 与 `Failed` 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Pending,
    Executing,
    Completed(CallOutcome),
    Failed,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Completed(_) | CallState::Failed)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Pending => f.write_str("Pending"),
            CallState::Executing => f.write_str("Executing"),
            CallState::Completed(CallOutcome::Success) => f.write_str("Completed(success)"),
            CallState::Completed(CallOutcome::Error) => f.write_str("Completed(error)"),
            CallState::Failed => f.write_str("Failed"),
        }
    }
}

/// 记录状态迁移，每次迁移输出一条 debug 日志
struct CallTracker<'a> {
    endpoint: &'a str,
    state: CallState,
}

impl<'a> CallTracker<'a> {
    fn new(endpoint: &'a str) -> Self {
        CallTracker {
            endpoint,
            state: CallState::Pending,
        }
    }

    fn advance(&mut self, next: CallState) {
        debug_assert!(!self.state.is_terminal(), "call already finished");
        log::debug!("{}: {} -> {}", self.endpoint, self.state, next);
        self.state = next;
    }
}

/// 双结果调用适配器
///
/// 执行请求（经过拦截器链），再根据状态码把响应体解码为成功类型 `S`
/// 或错误类型 `E`。本层不做重试，也不处理重定向。
#[derive(Debug, Clone)]
pub struct DualResponseCallAdapter {
    registry: Arc<ConverterRegistry>,
}

impl DualResponseCallAdapter {
    pub fn new(registry: Arc<ConverterRegistry>) -> Self {
        DualResponseCallAdapter { registry }
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// 注解中的端点描述，缺省为 `METHOD url`
    pub fn endpoint_info(request: &HttpRequest, annotations: &CallAnnotations) -> String {
        annotations
            .endpoint_info()
            .map(str::to_string)
            .unwrap_or_else(|| request.endpoint())
    }

    pub fn adapt<S, E>(
        &self,
        request: HttpRequest,
        annotations: &CallAnnotations,
        chain: &InterceptorChain,
        transport: &dyn Transport,
    ) -> Result<DualResponse<S, E>>
    where
        S: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
    {
        let endpoint = Self::endpoint_info(&request, annotations);
        let mut tracker = CallTracker::new(&endpoint);
        log::info!("API call: {}", endpoint);

        tracker.advance(CallState::Executing);
        let raw = match chain.proceed(request, transport) {
            Ok(raw) => raw,
            Err(e) => {
                tracker.advance(CallState::Failed);
                log::error!("API call failed: {}: {:#}", endpoint, e);
                return Err(DuetError::http_call(endpoint, e));
            }
        };

        let (success, error) = if raw.is_successful() {
            tracker.advance(CallState::Completed(CallOutcome::Success));
            let success = self.registry.decode_response::<S>(raw.body.as_ref(), annotations)?;
            (success, None)
        } else {
            tracker.advance(CallState::Completed(CallOutcome::Error));
            let error = self.registry.decode_response::<E>(raw.body.as_ref(), annotations)?;
            (None, error)
        };

        Ok(DualResponse::new(
            success,
            error,
            raw,
            endpoint,
            annotations.clone(),
        ))
    }

    /// 把保留的原始响应体解码为任意类型，不受状态码限制
    pub fn convert_body<T, S, E>(&self, response: &DualResponse<S, E>) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.registry.decode_response::<T>(
            response.raw_response().body.as_ref(),
            response.call_annotations(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{EchoTransport, RawResponse};
    use crate::converter::Body;
    use crate::header::ContentType;
    use reqwest::{Method, Url};

    struct Unreachable;

    impl Transport for Unreachable {
        fn execute(&self, _request: HttpRequest) -> anyhow::Result<RawResponse> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    fn adapter() -> DualResponseCallAdapter {
        DualResponseCallAdapter::new(Arc::new(ConverterRegistry::with_defaults()))
    }

    fn echo(status: u16, body: &str) -> HttpRequest {
        let url = Url::parse(&format!("http://localhost/echo?status={}", status)).unwrap();
        let mut request = HttpRequest::new(Method::POST, url);
        request.body = Some(Body::new(ContentType::TEXT_PLAIN, body));
        request
    }

    #[test]
    fn test_success_slot() {
        let response = adapter()
            .adapt::<String, String>(
                echo(200, "hello"),
                &CallAnnotations::new(),
                &InterceptorChain::new(),
                &EchoTransport,
            )
            .unwrap();
        assert_eq!(response.success_body().map(String::as_str), Some("hello"));
        assert_eq!(response.error_body(), None);
        assert!(response.is_successful());
    }

    #[test]
    fn test_error_slot() {
        let response = adapter()
            .adapt::<String, String>(
                echo(500, "boom"),
                &CallAnnotations::new(),
                &InterceptorChain::new(),
                &EchoTransport,
            )
            .unwrap();
        assert_eq!(response.success_body(), None);
        assert_eq!(response.error_body().map(String::as_str), Some("boom"));
        assert!(!response.is_successful());
    }

    #[test]
    fn test_unit_slot_skips_conversion() {
        // 没有为 text/html 注册转换器，但成功类型为 () 时不会查找
        let mut request = echo(200, "<html/>");
        request.body = Some(Body::new(ContentType::TEXT_HTML, "<html/>"));
        let response = adapter()
            .adapt::<(), String>(
                request,
                &CallAnnotations::new(),
                &InterceptorChain::new(),
                &EchoTransport,
            )
            .unwrap();
        assert_eq!(response.success_body(), None);
        assert_eq!(response.error_body(), None);
    }

    #[test]
    fn test_transport_failure() {
        let error = adapter()
            .adapt::<String, String>(
                echo(200, "hello"),
                &CallAnnotations::new().with_endpoint_info("Echo endpoint"),
                &InterceptorChain::new(),
                &Unreachable,
            )
            .unwrap_err();
        match &error {
            DuetError::HttpCall { endpoint, .. } => assert_eq!(endpoint, "Echo endpoint"),
            other => panic!("unexpected error: {:?}", other),
        }
        let source = std::error::Error::source(&error).unwrap();
        assert!(source.to_string().contains("connection refused"));
    }

    #[test]
    fn test_endpoint_info_default() {
        let request = echo(200, "x");
        assert_eq!(
            DualResponseCallAdapter::endpoint_info(&request, &CallAnnotations::new()),
            "POST http://localhost/echo?status=200"
        );
    }

    #[test]
    fn test_convert_body_on_demand() {
        let adapter = adapter();
        let response = adapter
            .adapt::<(), ()>(
                echo(400, "42"),
                &CallAnnotations::new(),
                &InterceptorChain::new(),
                &EchoTransport,
            )
            .unwrap();
        let value: Option<i32> = adapter.convert_body(&response).unwrap();
        assert_eq!(value, Some(42));
    }

    #[test]
    fn test_call_state_display() {
        assert_eq!(CallState::Completed(CallOutcome::Error).to_string(), "Completed(error)");
        assert!(CallState::Failed.is_terminal());
        assert!(!CallState::Executing.is_terminal());
    }
}
