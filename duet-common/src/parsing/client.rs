use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::{Ident, LitBool, LitStr, Path, Token, parenthesized, token};

use crate::call::{ProxySettings, ProxyType};
use crate::types::{HttpClientArgs, ProxyArg};

impl Parse for HttpClientArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = HttpClientArgs {
            base_url: None,
            interceptor: None,
            proxy: None,
        };

        while !input.is_empty() {
            let key = input.call(Ident::parse_any)?;
            match key.to_string().as_str() {
                "base_url" => {
                    input.parse::<Token![=]>()?;
                    let value = input
                        .parse::<LitStr>()
                        .map_err(|e| syn::Error::new(e.span(), "base_url must be a string literal"))?;
                    set_once(&mut args.base_url, value, &key)?;
                }
                "interceptor" => {
                    input.parse::<Token![=]>()?;
                    let value = input
                        .parse::<Path>()
                        .map_err(|e| syn::Error::new(e.span(), "interceptor must be a type path"))?;
                    set_once(&mut args.interceptor, value, &key)?;
                }
                "proxy" => {
                    let value = if input.peek(token::Paren) {
                        let content;
                        parenthesized!(content in input);
                        parse_proxy_fields(&content, &key)?
                    } else {
                        input.parse::<Token![=]>()?;
                        parse_proxy_value(input)?
                    };
                    set_once(&mut args.proxy, value, &key)?;
                }
                _ => {
                    return Err(syn::Error::new(
                        key.span(),
                        "Only 'base_url', 'interceptor', or 'proxy' are supported",
                    ));
                }
            }

            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        Ok(args)
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, key: &Ident) -> syn::Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new(key.span(), format!("duplicate '{}' argument", key)));
    }
    *slot = Some(value);
    Ok(())
}

/// `proxy = "url"` 或 `proxy = false`
fn parse_proxy_value(input: ParseStream) -> syn::Result<ProxyArg> {
    if input.peek(LitStr) {
        let url: LitStr = input.parse()?;
        if ProxyType::infer(&url.value()).is_none() {
            return Err(syn::Error::new(
                url.span(),
                "Cannot infer proxy type from URL. Use proxy(type = http/socks5, url = \"...\") format or ensure URL starts with http://, https://, or socks5://",
            ));
        }
        return Ok(ProxyArg::Proxy {
            settings: ProxySettings::new(url.value()),
            span: url.span(),
        });
    }
    if input.peek(LitBool) {
        let flag: LitBool = input.parse()?;
        if flag.value {
            return Err(syn::Error::new(
                flag.span(),
                "proxy = true is not supported, use proxy = \"url\" instead",
            ));
        }
        return Ok(ProxyArg::Disabled(flag.span()));
    }
    Err(input.error("proxy must be a string literal (URL) or false (to disable)"))
}

/// `proxy(type = socks5, url = "...", username = "...", password = "...", no_proxy = "...")`
fn parse_proxy_fields(content: ParseStream, key: &Ident) -> syn::Result<ProxyArg> {
    let mut settings = ProxySettings::new(String::new());
    let mut url = None;

    while !content.is_empty() {
        // `type` 是关键字，普通的 Ident 解析会拒绝它
        let field = content.call(Ident::parse_any)?;
        content.parse::<Token![=]>()?;
        match field.to_string().as_str() {
            "type" => {
                let name = content.call(Ident::parse_any)?;
                let proxy_type = name
                    .to_string()
                    .parse::<ProxyType>()
                    .map_err(|_| syn::Error::new(name.span(), "proxy type must be 'http' or 'socks5'"))?;
                set_once(&mut settings.proxy_type, proxy_type, &field)?;
            }
            "url" => set_once(&mut url, string_field(content, &field)?, &field)?,
            "username" => set_once(&mut settings.username, string_field(content, &field)?, &field)?,
            "password" => set_once(&mut settings.password, string_field(content, &field)?, &field)?,
            "no_proxy" => set_once(&mut settings.no_proxy, string_field(content, &field)?, &field)?,
            _ => {
                return Err(syn::Error::new(
                    field.span(),
                    "Only 'type', 'url', 'username', 'password', or 'no_proxy' are supported in proxy configuration",
                ));
            }
        }

        if content.is_empty() {
            break;
        }
        content.parse::<Token![,]>()?;
    }

    settings.url = url.ok_or_else(|| {
        syn::Error::new(key.span(), "proxy configuration must include 'url'")
    })?;
    if settings.username.is_some() != settings.password.is_some() {
        return Err(syn::Error::new(
            key.span(),
            "proxy username and password must be given together",
        ));
    }
    Ok(ProxyArg::Proxy {
        settings,
        span: key.span(),
    })
}

fn string_field(content: ParseStream, field: &Ident) -> syn::Result<String> {
    content
        .parse::<LitStr>()
        .map(|lit| lit.value())
        .map_err(|e| syn::Error::new(e.span(), format!("{} must be a string literal", field)))
}

/// 解析HTTP客户端参数的公共函数
pub fn parse_http_client_args(input: ParseStream) -> syn::Result<HttpClientArgs> {
    HttpClientArgs::parse(input)
}
