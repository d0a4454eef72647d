use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::LitStr;

use crate::header::ContentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// 该方法的最后一个参数是否作为请求体
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    /// 生成代码中使用的 `reqwest::Method` 常量
    pub fn method_tokens(&self) -> TokenStream {
        let ident = syn::Ident::new(self.as_str(), Span::call_site());
        quote! { ::duet_common::reqwest::Method::#ident }
    }
}

/// 方法属性中声明的请求 Content-Type
///
/// 既可以写简写标识符（`json`、`text`、`octet_stream`、`form_urlencoded`、`xml`），
/// 也可以写完整的媒体类型字符串。解析时即校验，非法值在编译期报错。
#[derive(Clone)]
pub struct ContentTypeArg {
    value: LitStr,
}

impl ContentTypeArg {
    pub fn from_ident(ident: &syn::Ident) -> syn::Result<Self> {
        let value = match ident.to_string().as_str() {
            "json" => ContentType::APP_JSON,
            "text" => ContentType::TEXT_PLAIN,
            "octet_stream" => ContentType::APP_OCTET_STREAM,
            "form_urlencoded" => ContentType::APP_FORM_URLENCODED,
            "xml" => ContentType::APP_XML,
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "content_type must be one of 'json', 'text', 'octet_stream', 'form_urlencoded', 'xml' or a media type string",
                ));
            }
        };
        Ok(ContentTypeArg {
            value: LitStr::new(&value.to_string(), ident.span()),
        })
    }

    pub fn from_lit(lit: &LitStr) -> syn::Result<Self> {
        let parsed = ContentType::parse(&lit.value())
            .map_err(|e| syn::Error::new_spanned(lit, e.to_string()))?;
        if parsed.is_null() {
            return Err(syn::Error::new_spanned(lit, "content_type must not be null"));
        }
        Ok(ContentTypeArg {
            value: LitStr::new(&parsed.to_string(), lit.span()),
        })
    }

    /// 规范化后的媒体类型字符串
    pub fn value(&self) -> String {
        self.value.value()
    }

    pub fn lit(&self) -> &LitStr {
        &self.value
    }
}

impl PartialEq for ContentTypeArg {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_method_tokens() {
        assert_eq!(
            HttpMethod::Patch.method_tokens().to_string(),
            ":: duet_common :: reqwest :: Method :: PATCH"
        );
        assert!(HttpMethod::Put.has_body());
        assert!(!HttpMethod::Delete.has_body());
    }

    #[test]
    fn test_content_type_shorthand() {
        let ident: syn::Ident = parse_quote! { text };
        assert_eq!(ContentTypeArg::from_ident(&ident).unwrap().value(), "text/plain");
        let ident: syn::Ident = parse_quote! { yaml };
        assert!(ContentTypeArg::from_ident(&ident).is_err());
    }

    #[test]
    fn test_content_type_literal() {
        let lit: LitStr = parse_quote! { "Application/JSON; charset=UTF-8" };
        assert_eq!(
            ContentTypeArg::from_lit(&lit).unwrap().value(),
            ContentType::APP_JSON_UTF8.to_string()
        );
        let lit: LitStr = parse_quote! { "not a type" };
        assert!(ContentTypeArg::from_lit(&lit).is_err());
    }
}
