use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{LitStr, Meta, Path, Token};

use crate::types::{ContentTypeArg, HandlerArgs, HttpMethod};

impl Parse for HandlerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut url = None;
        let mut endpoint = None;
        let mut content_type: Option<ContentTypeArg> = None;
        let mut headers = Punctuated::new();
        let mut converters = Vec::new();
        let mut request_converters = Vec::new();
        let mut response_converters = Vec::new();
        let mut interceptor = None;

        let pairs = Punctuated::<Meta, Token![,]>::parse_terminated(input)?;
        for pair in pairs {
            if let Meta::NameValue(name_value) = pair {
                let key = name_value.path.get_ident().ok_or_else(|| {
                    syn::Error::new_spanned(&name_value.path, "expected identifier as key")
                })?;

                match key.to_string().as_str() {
                    "url" => {
                        url = Some(parse_string_value(&name_value.value, "url")?);
                    }
                    "endpoint" => {
                        endpoint = Some(parse_string_value(&name_value.value, "endpoint")?);
                    }
                    "content_type" => {
                        let parsed = parse_content_type_value(&name_value.value)?;
                        set_content_type(&mut content_type, parsed, &name_value.value)?;
                    }
                    "header" => {
                        let header = parse_string_value(&name_value.value, "header")?;
                        let (name, value) = HandlerArgs::split_header(&header)?;
                        if name.eq_ignore_ascii_case("content-type") {
                            let declared = LitStr::new(&value, header.span());
                            let parsed = ContentTypeArg::from_lit(&declared)?;
                            set_content_type(&mut content_type, parsed, &header)?;
                        }
                        headers.push(header);
                    }
                    "converter" => {
                        converters.push(parse_path_value(&name_value.value, "converter")?);
                    }
                    "request_converter" => {
                        request_converters
                            .push(parse_path_value(&name_value.value, "request_converter")?);
                    }
                    "response_converter" => {
                        response_converters
                            .push(parse_path_value(&name_value.value, "response_converter")?);
                    }
                    "interceptor" => {
                        interceptor = Some(parse_path_value(&name_value.value, "interceptor")?);
                    }
                    _ => {
                        return Err(syn::Error::new_spanned(
                            key,
                            "Only 'url', 'endpoint', 'content_type', 'header', 'converter', 'request_converter', 'response_converter', and 'interceptor' are supported",
                        ));
                    }
                }
            } else {
                return Err(syn::Error::new_spanned(pair, "expected key-value pair"));
            }
        }

        let url = url.ok_or_else(|| syn::Error::new(input.span(), "Missing required 'url' parameter"))?;

        // 具体方法由各个属性宏设置
        Ok(HandlerArgs {
            url,
            method: HttpMethod::Get,
            endpoint,
            content_type,
            headers,
            converters,
            request_converters,
            response_converters,
            interceptor,
        })
    }
}

fn set_content_type<T: quote::ToTokens>(
    slot: &mut Option<ContentTypeArg>,
    declared: ContentTypeArg,
    span: &T,
) -> syn::Result<()> {
    match slot {
        Some(existing) if *existing != declared => Err(syn::Error::new_spanned(
            span,
            format!(
                "conflicting content types '{}' and '{}'",
                existing.value(),
                declared.value()
            ),
        )),
        _ => {
            *slot = Some(declared);
            Ok(())
        }
    }
}

fn parse_string_value(value: &syn::Expr, key: &str) -> syn::Result<LitStr> {
    if let syn::Expr::Lit(syn::ExprLit {
        lit: syn::Lit::Str(lit),
        ..
    }) = value
    {
        Ok(lit.clone())
    } else {
        Err(syn::Error::new_spanned(
            value,
            format!("{} must be a string literal", key),
        ))
    }
}

fn parse_content_type_value(value: &syn::Expr) -> syn::Result<ContentTypeArg> {
    match value {
        syn::Expr::Path(expr_path) => {
            let ident = expr_path.path.get_ident().ok_or_else(|| {
                syn::Error::new_spanned(expr_path, "content_type must be a simple identifier")
            })?;
            ContentTypeArg::from_ident(ident)
        }
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) => ContentTypeArg::from_lit(lit),
        _ => Err(syn::Error::new_spanned(
            value,
            "content_type must be an identifier (e.g., json, text) or a string literal",
        )),
    }
}

fn parse_path_value(value: &syn::Expr, key: &str) -> syn::Result<Path> {
    if let syn::Expr::Path(expr_path) = value {
        Ok(expr_path.path.clone())
    } else {
        Err(syn::Error::new_spanned(
            value,
            format!("{} must be a type path", key),
        ))
    }
}

/// 解析处理器参数的公共函数
pub fn parse_handler_args(input: ParseStream) -> syn::Result<HandlerArgs> {
    HandlerArgs::parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;
    use syn::parse_quote;

    #[test]
    fn test_parse_string_value() {
        let expr = parse_quote! { "/api/test" };
        let result = parse_string_value(&expr, "url").unwrap();
        assert_eq!(result.value(), "/api/test");

        let expr = parse_quote! { 42 };
        let error = parse_string_value(&expr, "url").err().unwrap();
        assert_eq!(error.to_string(), "url must be a string literal");
    }

    #[test]
    fn test_parse_content_type_value() {
        let expr = parse_quote! { json };
        let result = parse_content_type_value(&expr).unwrap();
        assert_eq!(result.value(), "application/json");

        let expr = parse_quote! { "text/xml" };
        assert_eq!(parse_content_type_value(&expr).unwrap().value(), "text/xml");
    }

    #[test]
    fn test_parse_full_handler_args() {
        let tokens = quote! {
            url = "/users/{id}",
            endpoint = "Get user",
            header = "Authorization: Bearer {token}",
            converter = my::UpperCase,
            response_converter = my::Lenient,
            interceptor = my::Audit
        };
        let args = syn::parse2::<HandlerArgs>(tokens).unwrap();
        assert_eq!(args.url.value(), "/users/{id}");
        assert_eq!(args.endpoint.unwrap().value(), "Get user");
        assert_eq!(args.headers.len(), 1);
        assert_eq!(args.converters.len(), 1);
        assert!(args.request_converters.is_empty());
        assert_eq!(args.response_converters.len(), 1);
        assert!(args.interceptor.is_some());
        assert!(args.content_type.is_none());
    }

    #[test]
    fn test_content_type_header() {
        let tokens = quote! { url = "/echo", header = "Content-Type: text/plain" };
        let args = syn::parse2::<HandlerArgs>(tokens).unwrap();
        assert_eq!(args.content_type.unwrap().value(), "text/plain");

        let tokens = quote! { url = "/echo", content_type = json, header = "Content-Type: text/plain" };
        let error = syn::parse2::<HandlerArgs>(tokens).err().unwrap();
        assert!(error.to_string().contains("conflicting content types"));
    }

    #[test]
    fn test_invalid_handler_args() {
        assert!(syn::parse2::<HandlerArgs>(quote! { endpoint = "x" }).is_err());
        assert!(syn::parse2::<HandlerArgs>(quote! { url = "/x", retry = "3" }).is_err());
        assert!(syn::parse2::<HandlerArgs>(quote! { url = "/x", header = "no separator" }).is_err());
        assert!(syn::parse2::<HandlerArgs>(quote! { url = "/x", content_type = yaml }).is_err());
    }
}
