use proc_macro2::TokenStream;
use quote::quote;
use syn::ItemStruct;

use duet_common::{HttpClientArgs, ProxyArg, ProxySettings, ProxyType};

/// 生成 HTTP 客户端的实现代码
///
/// 此函数为使用 `#[http_client]` 宏标注的结构体生成相应的实现代码，
/// 包括持有 `DuetClient` 的字段和构造函数。
///
/// # 参数
///
/// * `input` - 输入的结构体定义
/// * `args` - HTTP 客户端配置参数
///
/// # 返回值
///
/// 生成的 TokenStream，包含结构体定义和实现
pub fn generate_http_client_impl(
    mut input: ItemStruct,
    args: &HttpClientArgs,
) -> Result<TokenStream, syn::Error> {
    let struct_name = input.ident.clone();

    // 确保结构体是空的（无字段）
    if !matches!(input.fields, syn::Fields::Unit) {
        return Err(syn::Error::new_spanned(
            &input,
            "http_client macro only supports empty structs (e.g., `struct ApiClient;`)",
        ));
    }

    let base_url = args
        .base_url
        .as_ref()
        .map(|lit| lit.value())
        .unwrap_or_default();

    input.fields = syn::Fields::Named(syn::parse_quote! {{
        client: ::duet_common::DuetClient,
    }});

    let interceptor_init = args
        .interceptor
        .as_ref()
        .map(|path| quote! { .interceptor(<#path as ::std::default::Default>::default()) })
        .unwrap_or_default();

    let transport_config = generate_transport_config(args.proxy.as_ref());

    let expanded = quote! {
        #input

        impl #struct_name {
            /// 创建新的 HTTP 客户端实例
            ///
            /// 传输层无法创建（例如代理地址非法）时 panic，需要处理错误时使用 `try_new`。
            pub fn new() -> Self {
                Self::try_new()
                    .unwrap_or_else(|e| panic!("Failed to create HTTP client: {}", e))
            }

            pub fn try_new() -> ::duet_common::Result<Self> {
                let client = Self::client_builder()
                    .transport_config(#transport_config)
                    .build()?;
                Ok(#struct_name { client })
            }

            /// 使用自定义传输层，保留属性中声明的基础地址与拦截器
            pub fn with_transport(
                transport: impl ::duet_common::Transport + 'static,
            ) -> ::duet_common::Result<Self> {
                let client = Self::client_builder().transport(transport).build()?;
                Ok(#struct_name { client })
            }

            /// 直接使用已构建好的客户端
            pub fn with_client(client: ::duet_common::DuetClient) -> Self {
                #struct_name { client }
            }

            pub fn client(&self) -> &::duet_common::DuetClient {
                &self.client
            }

            fn client_builder() -> ::duet_common::DuetClientBuilder {
                ::duet_common::DuetClient::builder(#base_url)
                    #interceptor_init
            }
        }
    };

    Ok(expanded)
}

/// 把属性中的代理声明展开为 `TransportConfig` 表达式
fn generate_transport_config(proxy: Option<&ProxyArg>) -> TokenStream {
    let Some(proxy) = proxy else {
        return quote! { ::duet_common::TransportConfig::new() };
    };
    let config = proxy.transport_config();
    match &config.proxy {
        Some(settings) => {
            let settings = proxy_settings_tokens(settings);
            quote! { ::duet_common::TransportConfig::new().proxy(#settings) }
        }
        None if config.no_proxy => quote! { ::duet_common::TransportConfig::new().disable_proxy() },
        None => quote! { ::duet_common::TransportConfig::new() },
    }
}

fn proxy_settings_tokens(settings: &ProxySettings) -> TokenStream {
    let ProxySettings {
        url,
        proxy_type,
        username,
        password,
        no_proxy,
    } = settings;
    let proxy_type = match proxy_type {
        Some(ProxyType::Http) => quote! { Some(::duet_common::ProxyType::Http) },
        Some(ProxyType::Socks5) => quote! { Some(::duet_common::ProxyType::Socks5) },
        None => quote! { None },
    };
    let optional = |value: &Option<String>| match value {
        Some(value) => quote! { Some(#value.to_string()) },
        None => quote! { None },
    };
    let username = optional(username);
    let password = optional(password);
    let no_proxy = optional(no_proxy);

    quote! {
        ::duet_common::ProxySettings {
            url: #url.to_string(),
            proxy_type: #proxy_type,
            username: #username,
            password: #password,
            no_proxy: #no_proxy,
        }
    }
}
