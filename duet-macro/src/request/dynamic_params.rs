use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashMap;
use syn::{FnArg, LitStr, PatType};

/// 动态参数处理器
///
/// 处理URL和header中的动态参数占位符替换
pub struct DynamicParamsProcessor;

impl DynamicParamsProcessor {
    /// 生成模板字符串的构建表达式
    ///
    /// 没有占位符时生成字面量，否则生成 `format!`。找不到对应参数的占位符是编译错误。
    pub fn generate_template_expr(
        template: &LitStr,
        fn_inputs: &syn::punctuated::Punctuated<FnArg, syn::Token![,]>,
    ) -> syn::Result<TokenStream> {
        Self::generate_expr(&template.value(), template, fn_inputs)
    }

    /// 生成 header 名与值的构建表达式，只有值部分支持占位符
    pub fn generate_header_exprs(
        header: &LitStr,
        fn_inputs: &syn::punctuated::Punctuated<FnArg, syn::Token![,]>,
    ) -> syn::Result<(String, TokenStream)> {
        let (name, value) = duet_common::HandlerArgs::split_header(header)?;
        let value = Self::generate_expr(&value, header, fn_inputs)?;
        Ok((name, value))
    }

    fn generate_expr(
        template: &str,
        span: &LitStr,
        fn_inputs: &syn::punctuated::Punctuated<FnArg, syn::Token![,]>,
    ) -> syn::Result<TokenStream> {
        if !Self::has_placeholders(template) {
            return Ok(quote! { #template });
        }

        let param_map = Self::extract_parameters(fn_inputs);
        let mut format_str = template.to_string();
        let mut format_args = Vec::new();

        for placeholder in Self::extract_placeholders(template) {
            match Self::resolve_placeholder(&placeholder, &param_map) {
                Some(param_ident) => {
                    format_str = format_str.replacen(&format!("{{{}}}", placeholder), "{}", 1);
                    format_args.push(param_ident);
                }
                None => {
                    return Err(syn::Error::new_spanned(
                        span,
                        format!("Parameter '{}' not found in function parameters", placeholder),
                    ));
                }
            }
        }

        Ok(quote! { &format!(#format_str, #(#format_args),*) })
    }

    /// 检查字符串是否包含占位符
    fn has_placeholders(text: &str) -> bool {
        text.contains('{') && text.contains('}')
    }

    /// 提取字符串中的所有占位符
    fn extract_placeholders(text: &str) -> Vec<String> {
        let mut placeholders = Vec::new();
        let mut chars = text.chars();

        while let Some(ch) = chars.next() {
            if ch == '{' {
                let placeholder: String = chars.by_ref().take_while(|&c| c != '}').collect();
                if !placeholder.is_empty() {
                    placeholders.push(placeholder);
                }
            }
        }

        placeholders
    }

    /// 从函数参数中提取参数映射
    fn extract_parameters(
        fn_inputs: &syn::punctuated::Punctuated<FnArg, syn::Token![,]>,
    ) -> HashMap<String, syn::Ident> {
        let mut param_map = HashMap::new();

        // 跳过self参数，从第二个参数开始
        for (index, input) in fn_inputs.iter().skip(1).enumerate() {
            if let FnArg::Typed(PatType { pat, .. }) = input {
                if let syn::Pat::Ident(pat_ident) = pat.as_ref() {
                    // 支持两种引用方式：
                    // 1. 按名称：{param_name}
                    param_map.insert(pat_ident.ident.to_string(), pat_ident.ident.clone());

                    // 2. 按位置：{param0}, {param1}, etc.
                    param_map.insert(format!("param{}", index), pat_ident.ident.clone());
                }
            }
        }

        param_map
    }

    /// 参数名是否被模板中的占位符引用
    pub fn is_referenced(
        ident: &syn::Ident,
        index: usize,
        templates: &[String],
    ) -> bool {
        let by_name = ident.to_string();
        let by_index = format!("param{}", index);
        templates.iter().any(|template| {
            Self::extract_placeholders(template)
                .iter()
                .any(|placeholder| *placeholder == by_name || *placeholder == by_index)
        })
    }

    /// 解析占位符到对应的参数标识符
    fn resolve_placeholder(
        placeholder: &str,
        param_map: &HashMap<String, syn::Ident>,
    ) -> Option<syn::Ident> {
        param_map.get(placeholder).cloned()
    }
}
