use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use reqwest::header::HeaderValue;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DuetError, Result};

/// 不可变的 MIME 类型值对象
///
/// 由 type、subtype、charset 三部分组成，构造时统一转为小写，
/// 因此相等比较和哈希天然大小写不敏感。
///
/// type 和 subtype 要么同时为空，要么同时存在。两者都为空的实例是
/// "没有 Content-Type" 的哨兵值 [`ContentType::NULL`]，此时 charset 被忽略。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentType {
    type_: Option<Cow<'static, str>>,
    subtype: Option<Cow<'static, str>>,
    charset: Option<Cow<'static, str>>,
}

impl ContentType {
    /// 没有 Content-Type 的哨兵值
    pub const NULL: ContentType = ContentType {
        type_: None,
        subtype: None,
        charset: None,
    };

    pub const APP_JSON: ContentType = ContentType::from_static("application", "json", None);
    pub const APP_JSON_UTF8: ContentType =
        ContentType::from_static("application", "json", Some("utf-8"));
    pub const APP_XML: ContentType = ContentType::from_static("application", "xml", None);
    pub const APP_FORM_URLENCODED: ContentType =
        ContentType::from_static("application", "x-www-form-urlencoded", None);
    pub const APP_OCTET_STREAM: ContentType =
        ContentType::from_static("application", "octet-stream", None);
    pub const MULTIPART_FORM_DATA: ContentType =
        ContentType::from_static("multipart", "form-data", None);
    pub const TEXT_PLAIN: ContentType = ContentType::from_static("text", "plain", None);
    pub const TEXT_PLAIN_UTF8: ContentType =
        ContentType::from_static("text", "plain", Some("utf-8"));
    pub const TEXT_HTML: ContentType = ContentType::from_static("text", "html", None);
    pub const TEXT_XML: ContentType = ContentType::from_static("text", "xml", None);

    /// 创建 ContentType 并校验各部分
    ///
    /// # 错误
    ///
    /// - type 与 subtype 只有一个为空
    /// - 非空的 type、subtype 或 charset 是空白字符串
    pub fn new(type_: Option<&str>, subtype: Option<&str>, charset: Option<&str>) -> Result<Self> {
        if type_.is_none() != subtype.is_none() {
            return Err(DuetError::invalid_argument(
                "Type and subtype can only be null at the same time",
            ));
        }
        let type_ = normalize("type", type_)?;
        let subtype = normalize("subtype", subtype)?;
        let charset = normalize("charset", charset)?;
        if type_.is_none() {
            return Ok(ContentType::NULL);
        }
        Ok(ContentType {
            type_: type_.map(Cow::Owned),
            subtype: subtype.map(Cow::Owned),
            charset: charset.map(Cow::Owned),
        })
    }

    /// 用静态字符串构造常量，调用方需保证传入的值已经是小写且非空
    pub const fn from_static(
        type_: &'static str,
        subtype: &'static str,
        charset: Option<&'static str>,
    ) -> Self {
        let charset = match charset {
            Some(charset) => Some(Cow::Borrowed(charset)),
            None => None,
        };
        ContentType {
            type_: Some(Cow::Borrowed(type_)),
            subtype: Some(Cow::Borrowed(subtype)),
            charset,
        }
    }

    /// 解析 `type/subtype; charset=x` 形式的字符串
    ///
    /// 字面量 `null` 解析为哨兵值，保证 `to_string` 与 `parse` 可以往返。
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("null") {
            return Ok(ContentType::NULL);
        }
        let mime: mime::Mime = trimmed.parse().map_err(|e| {
            DuetError::invalid_argument(format!("Unable to parse content type '{}': {}", value, e))
        })?;
        Ok(ContentType::from(&mime))
    }

    /// 从响应头构造，缺失或无法解析时返回哨兵值
    pub fn from_header(value: Option<&HeaderValue>) -> Self {
        let Some(value) = value else {
            return ContentType::NULL;
        };
        let parsed = value
            .to_str()
            .map_err(|e| e.to_string())
            .and_then(|s| ContentType::parse(s).map_err(|e| e.to_string()));
        match parsed {
            Ok(content_type) => content_type,
            Err(e) => {
                log::debug!("Ignoring malformed Content-Type header {:?}: {}", value, e);
                ContentType::NULL
            }
        }
    }

    pub fn type_(&self) -> Option<&str> {
        self.type_.as_deref()
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// 是否为"没有 Content-Type"的哨兵值
    pub fn is_null(&self) -> bool {
        self.type_.is_none()
    }

    /// 去掉 charset 后的副本
    pub fn without_charset(&self) -> Self {
        ContentType {
            type_: self.type_.clone(),
            subtype: self.subtype.clone(),
            charset: None,
        }
    }

    /// 替换 charset 后的副本
    pub fn with_charset(&self, charset: &str) -> Result<Self> {
        ContentType::new(self.type_(), self.subtype(), Some(charset))
    }

    /// 转换为 `mime::Mime`，哨兵值返回 None
    pub fn to_mime(&self) -> Option<mime::Mime> {
        if self.is_null() {
            return None;
        }
        self.to_string().parse().ok()
    }

    /// 转换为请求头的值，哨兵值返回 None
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        if self.is_null() {
            return None;
        }
        HeaderValue::from_str(&self.to_string()).ok()
    }
}

fn normalize(name: &str, value: Option<&str>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Err(DuetError::invalid_argument(format!(
            "Parameter '{}' cannot be blank.",
            name
        ))),
        Some(v) => Ok(Some(v.trim().to_lowercase())),
    }
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::NULL
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.type_, &self.subtype) {
            (Some(type_), Some(subtype)) => {
                write!(f, "{}/{}", type_, subtype)?;
                if let Some(charset) = &self.charset {
                    write!(f, "; charset={}", charset)?;
                }
                Ok(())
            }
            _ => f.write_str("null"),
        }
    }
}

impl FromStr for ContentType {
    type Err = DuetError;

    fn from_str(s: &str) -> Result<Self> {
        ContentType::parse(s)
    }
}

impl From<&mime::Mime> for ContentType {
    fn from(mime: &mime::Mime) -> Self {
        let subtype = match mime.suffix() {
            Some(suffix) => format!("{}+{}", mime.subtype().as_str(), suffix.as_str()),
            None => mime.subtype().as_str().to_string(),
        };
        ContentType {
            type_: Some(Cow::Owned(mime.type_().as_str().to_lowercase())),
            subtype: Some(Cow::Owned(subtype.to_lowercase())),
            charset: mime
                .get_param(mime::CHARSET)
                .map(|charset| Cow::Owned(charset.as_str().to_lowercase())),
        }
    }
}

impl From<Option<ContentType>> for ContentType {
    fn from(value: Option<ContentType>) -> Self {
        value.unwrap_or(ContentType::NULL)
    }
}

/// 缺失的 Content-Type 与哨兵值相等
impl PartialEq<Option<ContentType>> for ContentType {
    fn eq(&self, other: &Option<ContentType>) -> bool {
        match other {
            Some(other) => self == other,
            None => self.is_null(),
        }
    }
}

impl Serialize for ContentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        ContentType::parse(&value).map_err(serde::de::Error::custom)
    }
}
