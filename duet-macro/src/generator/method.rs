use proc_macro2::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{FnArg, ItemFn, Token};

use duet_common::HandlerArgs;

use crate::error::ErrorHandler;
use crate::request::{BodyParam, DynamicParamsProcessor, RequestBuilder};

/// 生成 HTTP 方法的实现代码
///
/// 此函数为使用 HTTP 方法宏（如 `#[get]`, `#[post]` 等）标注的函数生成相应的实现代码。
/// 生成的方法是阻塞的：构建请求、经过拦截器链执行，再由双结果适配器按状态码解码响应体。
///
/// 方法级注解在首次调用时构造一次，保存在方法内部的 `OnceLock` 中。
pub fn generate_http_method(item: &ItemFn, handler_args: &HandlerArgs) -> syn::Result<TokenStream> {
    let fn_sig = &item.sig;
    let fn_name = &fn_sig.ident;
    let inputs = &fn_sig.inputs;
    let output = &fn_sig.output;
    let vis = &item.vis;
    let attrs = &item.attrs;

    if let Some(asyncness) = &fn_sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "duet client methods are blocking, remove `async`",
        ));
    }

    // 验证函数参数
    validate_function_inputs(inputs)?;

    // 验证并提取返回类型
    let (success_type, error_type) = ErrorHandler::validate_and_extract_return_types(output)?;

    // 生成函数参数和请求体处理代码
    let (params, body) = collect_parameters(inputs, handler_args)?;

    let call_annotations = RequestBuilder::generate_call_annotations(handler_args);
    let parameter_annotations = body
        .as_ref()
        .map(|body| {
            let init = RequestBuilder::generate_parameter_annotations(body);
            quote! {
                static PARAMETER_ANNOTATIONS: ::std::sync::OnceLock<::duet_common::ParameterAnnotations> =
                    ::std::sync::OnceLock::new();
                let parameter_annotations = PARAMETER_ANNOTATIONS.get_or_init(|| #init);
            }
        })
        .unwrap_or_default();

    let request_builder_code =
        RequestBuilder::generate_request_builder_code(handler_args, body.as_ref(), inputs)?;

    Ok(quote! {
        #(#attrs)*
        #vis fn #fn_name(&self #(, #params)*) #output {
            static ANNOTATIONS: ::std::sync::OnceLock<::duet_common::CallAnnotations> =
                ::std::sync::OnceLock::new();
            let annotations = ANNOTATIONS.get_or_init(|| #call_annotations);
            #parameter_annotations

            #request_builder_code
                .execute::<#success_type, #error_type>()
        }
    })
}

/// 验证函数输入参数
fn validate_function_inputs(inputs: &Punctuated<FnArg, Token![,]>) -> Result<(), syn::Error> {
    let self_arg = inputs
        .first()
        .ok_or_else(|| syn::Error::new_spanned(inputs, "method must have at least 'self' parameter"))?;

    match self_arg {
        FnArg::Receiver(receiver) if receiver.reference.is_some() && receiver.mutability.is_none() => {
            Ok(())
        }
        _ => Err(syn::Error::new_spanned(
            self_arg,
            "first parameter must be '&self'",
        )),
    }
}

/// 收集参数列表并识别请求体参数
///
/// POST/PUT/PATCH 的最后一个参数是请求体，除非它只被 URL 或请求头的占位符引用。
/// 带有 `#[converter(Path)]` 的参数总是请求体。`#[converter]` 属性会从生成的签名中去掉。
fn collect_parameters(
    inputs: &Punctuated<FnArg, Token![,]>,
    handler_args: &HandlerArgs,
) -> syn::Result<(Vec<TokenStream>, Option<BodyParam>)> {
    let mut templates = vec![handler_args.url.value()];
    templates.extend(handler_args.headers.iter().map(|header| header.value()));

    let total = inputs.len() - 1;
    let mut params = Vec::new();
    let mut body = None;

    for (index, input) in inputs.iter().skip(1).enumerate() {
        let FnArg::Typed(pat_type) = input else {
            return Err(syn::Error::new_spanned(input, "unexpected receiver"));
        };
        let syn::Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
            return Err(syn::Error::new_spanned(
                &pat_type.pat,
                "parameters must be simple identifiers",
            ));
        };
        let param_name = &pat_ident.ident;
        let param_type = &pat_type.ty;

        let mut converters = Vec::new();
        let mut kept_attrs = Vec::new();
        for attr in &pat_type.attrs {
            if attr.path().is_ident("converter") {
                converters.push(attr.parse_args::<syn::Path>()?);
            } else {
                kept_attrs.push(attr);
            }
        }

        let is_last = index + 1 == total;
        let is_body = handler_args.method.has_body()
            && is_last
            && (!converters.is_empty()
                || !DynamicParamsProcessor::is_referenced(param_name, index, &templates));

        if !converters.is_empty() && !is_body {
            return Err(syn::Error::new_spanned(
                pat_type,
                "#[converter] is only allowed on the request body parameter (the last parameter of POST, PUT or PATCH)",
            ));
        }

        if is_body {
            body = Some(BodyParam {
                ident: param_name.clone(),
                by_ref: matches!(param_type.as_ref(), syn::Type::Reference(_)),
                converters,
            });
        }

        params.push(quote! { #(#kept_attrs)* #param_name: #param_type });
    }

    Ok((params, body))
}
