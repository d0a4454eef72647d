pub mod annotation;
pub mod body_type;
pub mod json;
pub mod registry;
pub mod typed;

use std::any::Any;
use std::fmt;

use serde::Serialize;

use crate::error::{DuetError, Result};
use crate::header::ContentType;

pub use annotation::{CallAnnotations, ConverterAnnotation, ConverterClass, ParameterAnnotations};
pub use body_type::{BodyKind, BodyType, TargetType};
pub use json::JsonConverter;
pub use registry::ConverterRegistry;
pub use typed::{
    ByteArrayConverter, FileConverter, RawBodyConverter, ResourceFileConverter, ScalarConverter,
};

/// 请求体强制为空的标记值
///
/// 作为请求体传入时，转换器不再编码该值，而是直接返回"没有请求体"。
pub const NULL_BODY_VALUE: &str = "NULL_BODY_VALUE";

/// 请求体强制为 JSON `null` 的标记值
pub const NULL_JSON_VALUE: &str = "NULL_JSON_VALUE";

/// 转换方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 线上格式的消息体：字节加上它声明的 Content-Type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    content_type: ContentType,
    bytes: Vec<u8>,
}

impl Body {
    pub fn new(content_type: ContentType, bytes: impl Into<Vec<u8>>) -> Self {
        Body {
            content_type,
            bytes: bytes.into(),
        }
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 按 UTF-8 读取，非法字节以替换字符呈现
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// 可作为请求体的值
///
/// 对所有 `Serialize + Send + Sync + 'static` 的类型自动实现。
pub trait RequestValue: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn body_type(&self) -> BodyType;

    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T> RequestValue for T
where
    T: Serialize + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn body_type(&self) -> BodyType {
        BodyType::of::<T>()
    }

    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// 编码请求体时可用的上下文
#[derive(Debug, Clone, Copy)]
pub struct EncodeContext<'a> {
    /// 方法上声明的请求 Content-Type，未声明时为哨兵值
    pub content_type: &'a ContentType,
    pub parameter: &'a ParameterAnnotations,
    pub call: &'a CallAnnotations,
}

impl EncodeContext<'_> {
    /// 方法声明了 Content-Type 时使用声明值，否则使用转换器的默认值
    pub fn content_type_or(&self, default: ContentType) -> ContentType {
        if self.content_type.is_null() {
            default
        } else {
            self.content_type.clone()
        }
    }
}

/// 解码响应体时可用的上下文
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub target: TargetType,
    /// 响应实际的 Content-Type，没有时为哨兵值
    pub content_type: &'a ContentType,
    pub call: &'a CallAnnotations,
}

/// 消息体转换器
///
/// 负责把请求值编码为线上格式，以及把响应体解码为声明的类型。
/// `decode` 收到 `None` 表示响应没有消息体，返回 `Ok(None)` 表示结果为空。
pub trait Converter: Send + Sync {
    /// 诊断信息中使用的名称
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn encode(&self, value: &dyn RequestValue, ctx: &EncodeContext<'_>) -> Result<Option<Body>>;

    fn decode(
        &self,
        body: Option<&Body>,
        ctx: &DecodeContext<'_>,
    ) -> Result<Option<Box<dyn Any + Send>>>;
}

/// 校验实际类型是否在转换器声明支持的类型之内
pub fn assert_supported_type(
    converter: &str,
    actual: BodyType,
    expected: &[BodyType],
) -> Result<()> {
    if expected.contains(&actual) {
        return Ok(());
    }
    let expected = expected
        .iter()
        .map(|body_type| body_type.name())
        .collect::<Vec<_>>()
        .join(" or ");
    Err(DuetError::UnsupportedType {
        converter: converter.to_string(),
        actual: actual.name().to_string(),
        expected,
    })
}

/// 空响应体的统一处理：原始类型报错，其他类型返回 None
pub fn empty_body_value(target: BodyType) -> Result<Option<Box<dyn Any + Send>>> {
    if target.is_primitive() {
        return Err(DuetError::PrimitiveConversion {
            type_name: target.name().to_string(),
        });
    }
    Ok(None)
}

/// 请求值的文本形式，只识别 `String` 与 `&'static str`
pub fn text_value(value: &dyn RequestValue) -> Option<&str> {
    let any = value.as_any();
    if let Some(text) = any.downcast_ref::<String>() {
        return Some(text.as_str());
    }
    any.downcast_ref::<&'static str>().copied()
}

pub fn is_force_null_body(value: &dyn RequestValue) -> bool {
    text_value(value) == Some(NULL_BODY_VALUE)
}

pub fn is_force_null_json(value: &dyn RequestValue) -> bool {
    text_value(value) == Some(NULL_JSON_VALUE)
}

/// 把转换结果装箱
pub fn boxed<T: Any + Send>(value: T) -> Option<Box<dyn Any + Send>> {
    Some(Box::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_supported_type() {
        let expected = [BodyType::of::<Vec<u8>>(), BodyType::of::<String>()];
        assert!(assert_supported_type("Test", BodyType::of::<String>(), &expected).is_ok());

        let error = assert_supported_type("Test", BodyType::of::<i32>(), &expected).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unsupported type for converter Test\nReceived: i32\nExpected: alloc::vec::Vec<u8> or alloc::string::String\n"
        );
    }

    #[test]
    fn test_empty_body_value() {
        assert!(empty_body_value(BodyType::of::<String>()).unwrap().is_none());
        let error = empty_body_value(BodyType::of::<i64>()).unwrap_err();
        assert!(matches!(error, DuetError::PrimitiveConversion { type_name } if type_name == "i64"));
    }

    #[test]
    fn test_force_null_markers() {
        assert!(is_force_null_body(&NULL_BODY_VALUE));
        assert!(is_force_null_body(&NULL_BODY_VALUE.to_string()));
        assert!(is_force_null_json(&NULL_JSON_VALUE));
        assert!(!is_force_null_body(&"hello"));
        assert!(!is_force_null_body(&42));
    }

    #[test]
    fn test_request_value_body_type() {
        let value: &dyn RequestValue = &vec![1u8, 2, 3];
        assert_eq!(value.body_type(), BodyType::of::<Vec<u8>>());
        assert_eq!(value.to_json().unwrap(), b"[1,2,3]");
    }
}
