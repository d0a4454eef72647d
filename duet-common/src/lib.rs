//! Duet 运行时
//!
//! 面向测试的声明式 HTTP 客户端：按类型、包路径与 Content-Type 解析消息体转换器，
//! 并把每次调用的结果包装为同时携带成功体与错误体的 [`DualResponse`]。

pub mod assertion;
pub mod cache;
pub mod call;
pub mod converter;
pub mod error;
pub mod header;
pub mod interceptor;
pub mod model;
pub mod parsing;
pub mod response;
pub mod types;

pub use assertion::{AssertionFailure, SoftAsserter, softly_assert};
pub use call::{
    DualResponseCallAdapter, DuetClient, DuetClientBuilder, DuetRequestBuilder, EchoTransport,
    HttpRequest, ProxySettings, ProxyType, RawResponse, ReqwestTransport, Transport, TransportConfig,
};
pub use converter::{
    Body, BodyType, CallAnnotations, Converter, ConverterAnnotation, ConverterClass,
    ConverterRegistry, Direction, ParameterAnnotations, RequestValue, TargetType,
};
pub use error::{DuetError, Result};
pub use header::ContentType;
pub use interceptor::{
    CookieInterceptor, CookieStore, DuetInterceptor, InterceptorChain, LoggingInterceptor,
    NoOpInterceptor,
};
pub use model::{RawBody, ResourceFile};
pub use parsing::{parse_handler_args, parse_http_client_args};
pub use response::{DualResponse, HeadersAsserter, ResponseAsserter};
pub use types::{ContentTypeArg, HandlerArgs, HttpClientArgs, HttpMethod, ProxyArg};

// 生成代码通过 `duet_common::reqwest` 引用 HTTP 类型
pub use reqwest;
