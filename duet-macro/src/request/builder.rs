use proc_macro2::TokenStream;
use quote::quote;
use syn::FnArg;

use duet_common::HandlerArgs;

use super::DynamicParamsProcessor;

/// 请求体参数
pub struct BodyParam {
    pub ident: syn::Ident,
    /// 参数类型本身就是引用时直接传入，否则取引用
    pub by_ref: bool,
    /// `#[converter(Path)]` 声明的转换器
    pub converters: Vec<syn::Path>,
}

/// 请求构建器
///
/// 负责生成 `DuetClient::request(..)` 之后的链式调用：请求头、请求体和方法级拦截器。
pub struct RequestBuilder;

impl RequestBuilder {
    /// 生成请求构建代码
    ///
    /// 生成的代码引用局部变量 `annotations` 与（存在请求体时）`parameter_annotations`。
    pub fn generate_request_builder_code(
        handler_args: &HandlerArgs,
        body: Option<&BodyParam>,
        fn_inputs: &syn::punctuated::Punctuated<FnArg, syn::Token![,]>,
    ) -> syn::Result<TokenStream> {
        let method = handler_args.method.method_tokens();
        let url = DynamicParamsProcessor::generate_template_expr(&handler_args.url, fn_inputs)?;

        let mut header_calls = Vec::new();
        for header in &handler_args.headers {
            let (name, value) = DynamicParamsProcessor::generate_header_exprs(header, fn_inputs)?;
            header_calls.push(quote! { .header(#name, #value) });
        }

        let body_call = body.map(Self::generate_body_call).unwrap_or_default();

        let interceptor_call = handler_args
            .interceptor
            .as_ref()
            .map(|path| quote! { .interceptor::<#path>() })
            .unwrap_or_default();

        Ok(quote! {
            self.client
                .request(#method, #url, annotations)
                #(#header_calls)*
                #body_call
                #interceptor_call
        })
    }

    /// 生成请求体编码调用
    pub fn generate_body_call(body: &BodyParam) -> TokenStream {
        let ident = &body.ident;
        let value = if body.by_ref {
            quote! { #ident }
        } else {
            quote! { &#ident }
        };
        quote! { .body(#value, parameter_annotations) }
    }

    /// 生成方法级注解的初始化表达式
    pub fn generate_call_annotations(handler_args: &HandlerArgs) -> TokenStream {
        let endpoint = handler_args
            .endpoint
            .as_ref()
            .map(|lit| quote! { .with_endpoint_info(#lit) })
            .unwrap_or_default();

        // 字面量已在解析阶段校验
        let content_type = handler_args
            .content_type
            .as_ref()
            .map(|declared| {
                let lit = declared.lit();
                quote! {
                    .with_content_type(::duet_common::ContentType::parse(#lit).unwrap_or_default())
                }
            })
            .unwrap_or_default();

        let converters = handler_args.converters.iter().map(|path| {
            let annotation = Self::converter_annotation(path);
            quote! { .with_converter(#annotation) }
        });
        let request_converters = handler_args.request_converters.iter().map(|path| {
            let annotation = Self::converter_annotation(path);
            quote! { .with_request_converter(#annotation) }
        });
        let response_converters = handler_args.response_converters.iter().map(|path| {
            let annotation = Self::converter_annotation(path);
            quote! { .with_response_converter(#annotation) }
        });

        quote! {
            ::duet_common::CallAnnotations::new()
                #endpoint
                #content_type
                #(#converters)*
                #(#request_converters)*
                #(#response_converters)*
        }
    }

    /// 生成请求体参数注解的初始化表达式
    pub fn generate_parameter_annotations(body: &BodyParam) -> TokenStream {
        let converters = body.converters.iter().map(|path| {
            let annotation = Self::converter_annotation(path);
            quote! { .with_converter(#annotation) }
        });
        quote! {
            ::duet_common::ParameterAnnotations::new()
                #(#converters)*
        }
    }

    fn converter_annotation(path: &syn::Path) -> TokenStream {
        quote! {
            ::duet_common::ConverterAnnotation::new(::duet_common::ConverterClass::of::<#path>())
        }
    }
}
