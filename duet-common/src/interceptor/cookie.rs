use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::SystemTime;

use cookie::time::{Duration, OffsetDateTime};
use reqwest::Url;
use reqwest::header::{COOKIE, HeaderValue, SET_COOKIE};

use crate::call::{HttpRequest, RawResponse};
use crate::interceptor::DuetInterceptor;

/// 一条 cookie
///
/// 名称、值、域、路径和过期时间保存在 [`cookie::Cookie`] 中；
/// 域总是规范化为小写且不带前导点，过期时间总是绝对时间（`Max-Age` 在解析时换算）。
#[derive(Debug, Clone, PartialEq)]
pub struct Cookie {
    raw: cookie::Cookie<'static>,
    /// 未指定 Domain 属性时只发送给完全相同的主机
    host_only: bool,
}

impl Cookie {
    /// 创建只属于 `domain` 主机的会话 cookie
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        let (name, value, domain): (String, String, String) = (name.into(), value.into(), domain.into());
        let raw = cookie::Cookie::build((name, value))
            .domain(domain.to_lowercase())
            .path("/")
            .build();
        Cookie {
            raw,
            host_only: true,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path: String = path.into();
        self.raw.set_path(path);
        self
    }

    /// 同时发送给 `domain` 的子域名
    pub fn include_subdomains(mut self) -> Self {
        self.host_only = false;
        self
    }

    pub fn with_expires(mut self, expires: SystemTime) -> Self {
        self.raw.set_expires(OffsetDateTime::from(expires));
        self
    }

    /// 解析 `Set-Cookie` 头
    ///
    /// Domain 属性与请求主机不匹配时返回 None。Max-Age 优先于 Expires。
    pub fn parse(set_cookie: &str, url: &Url) -> Option<Cookie> {
        let host = url.host_str()?.to_lowercase();
        let parsed = match cookie::Cookie::parse(set_cookie) {
            Ok(parsed) => parsed.into_owned(),
            Err(e) => {
                log::warn!("Failed to parse Set-Cookie header '{}': {}", set_cookie, e);
                return None;
            }
        };

        let mut cookie = Cookie::new(parsed.name(), parsed.value(), host.clone())
            .with_path(default_path(url));

        if let Some(domain) = parsed.domain().map(|d| d.trim_start_matches('.').to_lowercase()) {
            if !domain.is_empty() {
                if !domain_match(&host, &domain) {
                    log::debug!(
                        "Cookie {} rejected: domain {} does not match {}",
                        parsed.name(),
                        domain,
                        host
                    );
                    return None;
                }
                cookie.raw.set_domain(domain);
                cookie.host_only = false;
            }
        }
        if let Some(path) = parsed.path().filter(|path| path.starts_with('/')) {
            cookie.raw.set_path(path.to_string());
        }

        let expires = match parsed.max_age() {
            Some(max_age) if max_age <= Duration::ZERO => Some(OffsetDateTime::UNIX_EPOCH),
            Some(max_age) => Some(OffsetDateTime::now_utc() + max_age),
            None => parsed.expires_datetime(),
        };
        if let Some(expires) = expires {
            cookie.raw.set_expires(expires);
        }
        Some(cookie)
    }

    pub fn name(&self) -> &str {
        self.raw.name()
    }

    pub fn value(&self) -> &str {
        self.raw.value()
    }

    pub fn domain(&self) -> &str {
        self.raw.domain().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.raw.path().unwrap_or("/")
    }

    pub fn host_only(&self) -> bool {
        self.host_only
    }

    pub fn expires(&self) -> Option<SystemTime> {
        self.raw.expires_datetime().map(SystemTime::from)
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires().is_some_and(|expires| expires <= now)
    }

    /// 底层的 [`cookie::Cookie`]
    pub fn as_raw(&self) -> &cookie::Cookie<'static> {
        &self.raw
    }

    /// 是否应随发往 `url` 的请求一起发送
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        let domain_ok = if self.host_only {
            host == self.domain()
        } else {
            domain_match(&host, self.domain())
        };
        domain_ok && path_match(url.path(), self.path())
    }

    fn same_key(&self, other: &Cookie) -> bool {
        self.name() == other.name() && self.domain() == other.domain() && self.path() == other.path()
    }
}

// cookie crate 只负责解析与表示，发送时的域与路径匹配按 RFC 6265 5.1.3 / 5.1.4
fn domain_match(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_match(request_path: &str, cookie_path: &str) -> bool {
    request_path == cookie_path
        || request_path.strip_prefix(cookie_path).is_some_and(|rest| {
            cookie_path.ends_with('/') || rest.starts_with('/')
        })
}

fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

/// 按线程隔离的 cookie 存储
///
/// 每个线程只能看到自己收到的 cookie，同一个客户端在多个测试线程间共享时
/// 会话互不干扰。所有操作都作用于当前线程。
#[derive(Debug, Default)]
pub struct CookieStore {
    jars: Mutex<HashMap<ThreadId, Vec<Cookie>>>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn jars(&self) -> MutexGuard<'_, HashMap<ThreadId, Vec<Cookie>>> {
        self.jars.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_jar<R>(&self, f: impl FnOnce(&mut Vec<Cookie>) -> R) -> R {
        let mut jars = self.jars();
        let jar = jars.entry(thread::current().id()).or_default();
        let now = SystemTime::now();
        jar.retain(|cookie| !cookie.is_expired(now));
        f(jar)
    }

    /// 当前线程的全部有效 cookie
    pub fn cookies(&self) -> Vec<Cookie> {
        self.with_jar(|jar| jar.clone())
    }

    /// 当前线程中发往 `url` 时应携带的 cookie
    pub fn cookies_for(&self, url: &Url) -> Vec<Cookie> {
        self.with_jar(|jar| jar.iter().filter(|c| c.matches(url)).cloned().collect())
    }

    pub fn cookies_named(&self, name: &str) -> Vec<Cookie> {
        self.with_jar(|jar| jar.iter().filter(|c| c.name() == name).cloned().collect())
    }

    /// 添加 cookie，覆盖同名、同域、同路径的旧值；已过期的 cookie 只会删除旧值
    pub fn add(&self, cookie: Cookie) {
        self.with_jar(|jar| {
            jar.retain(|existing| !existing.same_key(&cookie));
            if !cookie.is_expired(SystemTime::now()) {
                jar.push(cookie);
            }
        });
    }

    pub fn clear(&self) {
        self.jars().remove(&thread::current().id());
    }

    pub fn clear_domain(&self, domain: &str) {
        let domain = domain.to_lowercase();
        self.with_jar(|jar| jar.retain(|c| c.domain() != domain));
    }

    pub fn clear_named(&self, name: &str) {
        self.with_jar(|jar| jar.retain(|c| c.name() != name));
    }
}

/// Cookie 拦截器
///
/// 响应钩子保存 `Set-Cookie`，请求钩子为匹配的请求添加 `Cookie` 头。
#[derive(Debug, Default, Clone)]
pub struct CookieInterceptor {
    store: Arc<CookieStore>,
}

impl CookieInterceptor {
    pub fn new(store: Arc<CookieStore>) -> Self {
        CookieInterceptor { store }
    }

    pub fn store(&self) -> &Arc<CookieStore> {
        &self.store
    }
}

impl DuetInterceptor for CookieInterceptor {
    fn before_request(&self, mut request: HttpRequest) -> anyhow::Result<HttpRequest> {
        let cookies = self.store.cookies_for(&request.url);
        if cookies.is_empty() {
            return Ok(request);
        }
        let header = cookies
            .iter()
            .map(|c| c.as_raw().stripped().to_string())
            .collect::<Vec<_>>()
            .join("; ");
        request.headers.insert(COOKIE, HeaderValue::from_str(&header)?);
        Ok(request)
    }

    fn after_response(&self, response: RawResponse) -> anyhow::Result<RawResponse> {
        for value in response.headers.get_all(SET_COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            if let Some(cookie) = Cookie::parse(value, &response.url) {
                log::debug!("Store cookie {} for {}", cookie.name(), cookie.domain());
                self.store.add(cookie);
            }
        }
        Ok(response)
    }
}
