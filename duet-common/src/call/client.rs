use std::any::{TypeId, type_name};
use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

use crate::call::adapter::DualResponseCallAdapter;
use crate::call::reqwest_transport::{ReqwestTransport, TransportConfig};
use crate::call::transport::{HttpRequest, Transport};
use crate::converter::{CallAnnotations, ConverterRegistry, ParameterAnnotations, RequestValue};
use crate::cache::InstanceCache;
use crate::error::{DuetError, Result};
use crate::interceptor::{DuetInterceptor, InterceptorChain};
use crate::response::DualResponse;

/// 双结果 HTTP 客户端
///
/// 持有基础地址、传输层、转换器注册表和客户端级拦截器链。
/// 克隆开销很小，所有克隆共享同一注册表与方法级拦截器缓存。
#[derive(Clone)]
pub struct DuetClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    chain: InterceptorChain,
    method_interceptors: Arc<InstanceCache<dyn DuetInterceptor>>,
    adapter: DualResponseCallAdapter,
}

impl DuetClient {
    pub fn builder(base_url: impl Into<String>) -> DuetClientBuilder {
        DuetClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn registry(&self) -> &ConverterRegistry {
        self.adapter.registry()
    }

    pub fn interceptors(&self) -> &InterceptorChain {
        &self.chain
    }

    /// 解析请求地址
    ///
    /// 绝对地址原样使用，相对地址拼接在基础地址之后。
    pub fn resolve_url(&self, url: &str) -> Result<Url> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| DuetError::invalid_argument(format!("Invalid request url '{}': {}", joined, e)))
    }

    /// 开始构建一次请求
    pub fn request<'a>(
        &'a self,
        method: Method,
        url: &str,
        annotations: &'a CallAnnotations,
    ) -> DuetRequestBuilder<'a> {
        let request = self.resolve_url(url).map(|url| HttpRequest::new(method, url));
        DuetRequestBuilder {
            client: self,
            annotations,
            request,
            chain: self.chain.clone(),
        }
    }

    /// 通过客户端级拦截器链执行请求
    pub fn execute<S, E>(
        &self,
        request: HttpRequest,
        annotations: &CallAnnotations,
    ) -> Result<DualResponse<S, E>>
    where
        S: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
    {
        self.adapter
            .adapt(request, annotations, &self.chain, self.transport.as_ref())
    }

    /// 把响应的原始消息体按需解码为其他类型
    pub fn convert_body<T, S, E>(&self, response: &DualResponse<S, E>) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.adapter.convert_body(response)
    }

    /// 获取方法级拦截器，同一类型在客户端生命周期内只创建一次
    pub fn method_interceptor<I>(&self) -> Arc<dyn DuetInterceptor>
    where
        I: DuetInterceptor + Default + 'static,
    {
        self.method_interceptors
            .get_or_insert_with(TypeId::of::<I>(), type_name::<I>(), || {
                Arc::new(I::default()) as Arc<dyn DuetInterceptor>
            })
    }
}

impl std::fmt::Debug for DuetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuetClient")
            .field("base_url", &self.base_url)
            .field("chain", &self.chain)
            .field("registry", self.adapter.registry())
            .finish()
    }
}

/// `DuetClient` 构建器
pub struct DuetClientBuilder {
    base_url: String,
    transport: Option<Arc<dyn Transport>>,
    transport_config: TransportConfig,
    registry: Option<ConverterRegistry>,
    chain: InterceptorChain,
}

impl DuetClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        DuetClientBuilder {
            base_url: base_url.into(),
            transport: None,
            transport_config: TransportConfig::default(),
            registry: None,
            chain: InterceptorChain::new(),
        }
    }

    /// 使用自定义传输层，此时忽略 `transport_config`
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    /// 使用自定义注册表，缺省为 `ConverterRegistry::with_defaults()`
    pub fn registry(mut self, registry: ConverterRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 追加客户端级拦截器，按追加顺序执行
    pub fn interceptor(mut self, interceptor: impl DuetInterceptor + 'static) -> Self {
        self.chain.push(Arc::new(interceptor));
        self
    }

    pub fn shared_interceptor(mut self, interceptor: Arc<dyn DuetInterceptor>) -> Self {
        self.chain.push(interceptor);
        self
    }

    pub fn build(self) -> Result<DuetClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_config(&self.transport_config)?),
        };
        let registry = self.registry.unwrap_or_default();
        Ok(DuetClient {
            base_url: self.base_url,
            transport,
            chain: self.chain,
            method_interceptors: Arc::new(InstanceCache::new("method interceptor")),
            adapter: DualResponseCallAdapter::new(Arc::new(registry)),
        })
    }
}

/// 单次请求构建器
///
/// 构建过程中的错误会被推迟到 `build` / `execute` 时返回。
pub struct DuetRequestBuilder<'a> {
    client: &'a DuetClient,
    annotations: &'a CallAnnotations,
    request: Result<HttpRequest>,
    chain: InterceptorChain,
}

impl<'a> DuetRequestBuilder<'a> {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let Ok(request) = &mut self.request {
            let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| {
                DuetError::invalid_argument(format!("Invalid header name '{}': {}", name, e))
            });
            let value = HeaderValue::from_str(value.trim()).map_err(|e| {
                DuetError::invalid_argument(format!("Invalid header value '{}': {}", value, e))
            });
            match (name, value) {
                (Ok(name), Ok(value)) => {
                    request.headers.append(name, value);
                }
                (Err(e), _) | (_, Err(e)) => self.request = Err(e),
            }
        }
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        if let Ok(request) = &mut self.request {
            request.url.query_pairs_mut().append_pair(key, value);
        }
        self
    }

    /// 通过转换器注册表编码请求体
    pub fn body(mut self, value: &dyn RequestValue, parameter: &ParameterAnnotations) -> Self {
        if let Ok(request) = &mut self.request {
            match self
                .client
                .registry()
                .encode_request(value, parameter, self.annotations)
            {
                Ok(body) => request.body = body,
                Err(e) => self.request = Err(e),
            }
        }
        self
    }

    /// 追加方法级拦截器，在客户端级拦截器之后执行
    pub fn interceptor<I>(mut self) -> Self
    where
        I: DuetInterceptor + Default + 'static,
    {
        self.chain.push(self.client.method_interceptor::<I>());
        self
    }

    pub fn build(self) -> Result<HttpRequest> {
        self.request
    }

    pub fn execute<S, E>(self) -> Result<DualResponse<S, E>>
    where
        S: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
    {
        let request = self.request?;
        self.client.adapter.adapt(
            request,
            self.annotations,
            &self.chain,
            self.client.transport.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::EchoTransport;
    use crate::header::ContentType;
    use crate::interceptor::NoOpInterceptor;

    fn client(base_url: &str) -> DuetClient {
        DuetClient::builder(base_url)
            .transport(EchoTransport)
            .build()
            .unwrap()
    }

    #[test]
    fn test_resolve_url() {
        let client = client("http://localhost:8080/api/");
        assert_eq!(
            client.resolve_url("/users/1").unwrap().as_str(),
            "http://localhost:8080/api/users/1"
        );
        assert_eq!(
            client.resolve_url("https://example.com/x").unwrap().as_str(),
            "https://example.com/x"
        );
        assert!(matches!(
            DuetClient::builder("not a url").transport(EchoTransport).build().unwrap().resolve_url("x"),
            Err(DuetError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_request_builder() {
        let client = client("http://localhost");
        let annotations = CallAnnotations::new().with_content_type(ContentType::TEXT_PLAIN);
        let request = client
            .request(Method::POST, "/echo", &annotations)
            .header("X-Trace", " abc ")
            .query("status", "201")
            .body(&"hello".to_string(), &ParameterAnnotations::EMPTY)
            .build()
            .unwrap();

        assert_eq!(request.url.as_str(), "http://localhost/echo?status=201");
        assert_eq!(request.headers["X-Trace"], "abc");
        assert_eq!(request.body.unwrap().bytes(), b"hello");
    }

    #[test]
    fn test_deferred_error() {
        let client = client("http://localhost");
        let annotations = CallAnnotations::new();
        let error = client
            .request(Method::GET, "/echo", &annotations)
            .header("Bad Header", "x")
            .query("status", "200")
            .execute::<String, String>()
            .unwrap_err();
        assert!(error.to_string().contains("Invalid header name 'Bad Header'"));
    }

    #[test]
    fn test_execute_dual_response() {
        let client = client("http://localhost");
        let annotations = CallAnnotations::new().with_content_type(ContentType::TEXT_PLAIN);
        let response = client
            .request(Method::POST, "/echo?status=404", &annotations)
            .body(&"missing".to_string(), &ParameterAnnotations::EMPTY)
            .execute::<String, String>()
            .unwrap();
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.error_body().map(String::as_str), Some("missing"));
        assert_eq!(response.endpoint_info(), "POST http://localhost/echo?status=404");
    }

    #[test]
    fn test_method_interceptor_cached() {
        let client = client("http://localhost");
        let first = client.method_interceptor::<NoOpInterceptor>();
        let second = client.clone().method_interceptor::<NoOpInterceptor>();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
