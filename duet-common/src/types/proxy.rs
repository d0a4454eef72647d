use proc_macro2::Span;

use crate::call::{ProxySettings, TransportConfig};

/// `#[http_client]` 中 `proxy` 参数的解析结果
///
/// 解析阶段就落成运行时的 [`ProxySettings`]，代码生成只需原样展开。
#[derive(Debug, Clone)]
pub enum ProxyArg {
    /// `proxy = false`，系统代理也不使用
    Disabled(Span),
    /// `proxy = "url"` 或 `proxy(type = .., url = .., ..)`
    Proxy { settings: ProxySettings, span: Span },
}

impl ProxyArg {
    pub fn settings(&self) -> Option<&ProxySettings> {
        match self {
            ProxyArg::Proxy { settings, .. } => Some(settings),
            ProxyArg::Disabled(_) => None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, ProxyArg::Disabled(_))
    }

    /// 属性中声明代理的位置，用于报错
    pub fn span(&self) -> Span {
        match self {
            ProxyArg::Disabled(span) | ProxyArg::Proxy { span, .. } => *span,
        }
    }

    /// 对应的传输层配置
    pub fn transport_config(&self) -> TransportConfig {
        match self {
            ProxyArg::Disabled(_) => TransportConfig::new().disable_proxy(),
            ProxyArg::Proxy { settings, .. } => TransportConfig::new().proxy(settings.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::ProxyType;

    #[test]
    fn test_transport_config_from_arg() {
        let disabled = ProxyArg::Disabled(Span::call_site());
        assert!(disabled.is_disabled());
        assert!(disabled.settings().is_none());
        let config = disabled.transport_config();
        assert!(config.no_proxy);
        assert!(config.proxy.is_none());

        let mut settings = ProxySettings::new("proxy.local:1080");
        settings.proxy_type = Some(ProxyType::Socks5);
        let proxy = ProxyArg::Proxy {
            settings: settings.clone(),
            span: Span::call_site(),
        };
        let config = proxy.transport_config();
        assert!(!config.no_proxy);
        assert_eq!(config.proxy, Some(settings));
    }
}
