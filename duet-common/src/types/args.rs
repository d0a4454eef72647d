use syn::punctuated::Punctuated;
use syn::{LitStr, Path, Token};

use crate::types::{ContentTypeArg, HttpMethod, ProxyArg};

/// `#[get]`、`#[post]` 等方法属性的参数
pub struct HandlerArgs {
    pub url: LitStr,
    pub method: HttpMethod,
    /// 报告中使用的端点描述
    pub endpoint: Option<LitStr>,
    pub content_type: Option<ContentTypeArg>,
    /// `Key: Value` 形式的静态请求头，可包含占位符
    pub headers: Punctuated<LitStr, Token![,]>,
    /// 同时用于请求与响应的转换器
    pub converters: Vec<Path>,
    pub request_converters: Vec<Path>,
    pub response_converters: Vec<Path>,
    pub interceptor: Option<Path>,
}

impl HandlerArgs {
    /// 拆分 `Key: Value` 形式的请求头
    pub fn split_header(header: &LitStr) -> syn::Result<(String, String)> {
        let value = header.value();
        match value.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(syn::Error::new_spanned(
                header,
                "header must be in 'Key: Value' format",
            )),
        }
    }
}

/// `#[http_client]` 的参数
pub struct HttpClientArgs {
    pub base_url: Option<LitStr>,
    pub interceptor: Option<Path>,
    pub proxy: Option<ProxyArg>,
}
