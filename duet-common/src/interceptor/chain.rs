use std::fmt;
use std::sync::Arc;

use crate::call::{HttpRequest, RawResponse, Transport};
use crate::interceptor::DuetInterceptor;

/// 有序的拦截器链
///
/// 执行顺序：全部请求钩子 → 传输层 → 全部响应钩子，均按注册顺序。
/// 请求钩子或传输层失败时，按注册顺序通知每个拦截器的 `on_error`，
/// 然后原样返回错误。响应钩子的失败直接返回，不再触发 `on_error`。
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn DuetInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interceptor: Arc<dyn DuetInterceptor>) -> &mut Self {
        self.interceptors.push(interceptor);
        self
    }

    /// 在当前链之后追加拦截器，返回新的链
    pub fn with(&self, extra: impl IntoIterator<Item = Arc<dyn DuetInterceptor>>) -> Self {
        let mut interceptors = self.interceptors.clone();
        interceptors.extend(extra);
        InterceptorChain { interceptors }
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// 经过整条链执行一次请求
    pub fn proceed(
        &self,
        request: HttpRequest,
        transport: &dyn Transport,
    ) -> anyhow::Result<RawResponse> {
        let endpoint = request.endpoint();
        let dispatched = self
            .interceptors
            .iter()
            .try_fold(request, |request, interceptor| interceptor.before_request(request))
            .and_then(|request| transport.execute(request));

        let response = match dispatched {
            Ok(response) => response,
            Err(error) => {
                for interceptor in &self.interceptors {
                    interceptor.on_error(&endpoint, &error);
                }
                return Err(error);
            }
        };

        self.interceptors
            .iter()
            .try_fold(response, |response, interceptor| interceptor.after_response(response))
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.interceptors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::EchoTransport;
    use reqwest::header::HeaderValue;
    use reqwest::{Method, StatusCode, Url};
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recording {
        name: &'static str,
        journal: Journal,
        fail_request: bool,
    }

    impl Recording {
        fn new(name: &'static str, journal: &Journal) -> Arc<dyn DuetInterceptor> {
            Arc::new(Recording {
                name,
                journal: Arc::clone(journal),
                fail_request: false,
            })
        }

        fn failing(name: &'static str, journal: &Journal) -> Arc<dyn DuetInterceptor> {
            Arc::new(Recording {
                name,
                journal: Arc::clone(journal),
                fail_request: true,
            })
        }

        fn record(&self, event: &str) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event));
        }
    }

    impl DuetInterceptor for Recording {
        fn before_request(&self, mut request: HttpRequest) -> anyhow::Result<HttpRequest> {
            self.record("request");
            if self.fail_request {
                anyhow::bail!("{} rejected the request", self.name);
            }
            request
                .headers
                .append("X-Chain", HeaderValue::from_static(self.name));
            Ok(request)
        }

        fn after_response(&self, response: RawResponse) -> anyhow::Result<RawResponse> {
            self.record("response");
            Ok(response)
        }

        fn on_error(&self, _endpoint: &str, error: &anyhow::Error) {
            self.record(&format!("error({})", error));
        }
    }

    struct BrokenTransport;

    impl Transport for BrokenTransport {
        fn execute(&self, _request: HttpRequest) -> anyhow::Result<RawResponse> {
            anyhow::bail!("connection refused")
        }
    }

    fn request() -> HttpRequest {
        HttpRequest::new(Method::GET, Url::parse("http://localhost/echo").unwrap())
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let journal = Journal::default();
        let mut chain = InterceptorChain::new();
        chain
            .push(Recording::new("first", &journal))
            .push(Recording::new("second", &journal));

        let response = chain.proceed(request(), &EchoTransport).unwrap();
        assert_eq!(response.status, StatusCode::OK);
        let echoed: Vec<_> = response
            .headers
            .get_all("X-Chain")
            .iter()
            .map(|value| value.to_str().unwrap())
            .collect();
        assert_eq!(echoed, ["first", "second"]);
        assert_eq!(
            *journal.lock().unwrap(),
            ["first:request", "second:request", "first:response", "second:response"]
        );
    }

    #[test]
    fn test_transport_failure_notifies_every_hook() {
        let journal = Journal::default();
        let chain = InterceptorChain::new().with([
            Recording::new("first", &journal),
            Recording::new("second", &journal),
        ]);

        let error = chain.proceed(request(), &BrokenTransport).unwrap_err();
        assert_eq!(error.to_string(), "connection refused");
        assert_eq!(
            *journal.lock().unwrap(),
            [
                "first:request",
                "second:request",
                "first:error(connection refused)",
                "second:error(connection refused)",
            ]
        );
    }

    #[test]
    fn test_request_hook_failure_stops_dispatch() {
        let journal = Journal::default();
        let chain = InterceptorChain::new().with([
            Recording::failing("auth", &journal),
            Recording::new("logging", &journal),
        ]);

        let error = chain.proceed(request(), &EchoTransport).unwrap_err();
        assert_eq!(error.to_string(), "auth rejected the request");
        assert_eq!(
            *journal.lock().unwrap(),
            [
                "auth:request",
                "auth:error(auth rejected the request)",
                "logging:error(auth rejected the request)",
            ]
        );
    }
}
