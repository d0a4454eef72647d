mod common;
mod error;
mod generator;
mod request;

use crate::common::common_http_method;
use crate::generator::generate_http_client_impl;
use proc_macro::TokenStream;
use duet_common::{HttpMethod, parse_http_client_args};
use syn::{ItemStruct, parse_macro_input};

/// 把空结构体变成持有 `DuetClient` 的声明式客户端
///
/// ```ignore
/// #[http_client(base_url = "http://localhost:8080", interceptor = LoggingInterceptor)]
/// struct ApiClient;
/// ```
#[proc_macro_attribute]
pub fn http_client(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);

    // 解析属性参数
    let args = parse_macro_input!(args with parse_http_client_args);

    generate_http_client_impl(input, &args)
        .unwrap_or_else(|error| error.to_compile_error())
        .into()
}

#[proc_macro_attribute]
pub fn get(args: TokenStream, item: TokenStream) -> TokenStream {
    common_http_method(args, item, HttpMethod::Get)
}

#[proc_macro_attribute]
pub fn post(args: TokenStream, item: TokenStream) -> TokenStream {
    common_http_method(args, item, HttpMethod::Post)
}

#[proc_macro_attribute]
pub fn put(args: TokenStream, item: TokenStream) -> TokenStream {
    common_http_method(args, item, HttpMethod::Put)
}

#[proc_macro_attribute]
pub fn delete(args: TokenStream, item: TokenStream) -> TokenStream {
    common_http_method(args, item, HttpMethod::Delete)
}

#[proc_macro_attribute]
pub fn patch(args: TokenStream, item: TokenStream) -> TokenStream {
    common_http_method(args, item, HttpMethod::Patch)
}
