use thiserror::Error;

use crate::converter::Direction;
use crate::header::ContentType;

/// 装箱的底层错误，用于保留错误链
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Duet 统一结果类型
pub type Result<T> = std::result::Result<T, DuetError>;

/// Duet 错误类型
///
/// 转换器解析与调用适配过程中的所有错误都会以此类型同步返回给调用方，
/// 不会在内部被记录后吞掉。
#[derive(Error, Debug)]
pub enum DuetError {
    /// 参数非法（例如只提供了 type 或 subtype 之一的 ContentType）
    #[error("{0}")]
    InvalidArgument(String),

    /// 转换器收到了不在其支持列表中的类型
    #[error("Unsupported type for converter {converter}\nReceived: {actual}\nExpected: {expected}\n")]
    UnsupportedType {
        converter: String,
        actual: String,
        expected: String,
    },

    /// 四张表都没有匹配的转换器
    #[error(
        "Converter not found for {direction} body.\nContent-Type: {content_type}\nBody type: {body_type}\n\n{registered}"
    )]
    ConverterNotFound {
        direction: Direction,
        content_type: ContentType,
        body_type: String,
        registered: String,
    },

    /// 同一张表内有多个不同的转换器命中同一次查找
    #[error("Found more than one {direction} converter for type {body_type}:\n{candidates}")]
    ConverterConflict {
        direction: Direction,
        body_type: String,
        candidates: String,
    },

    /// 注解声明的转换器无法实例化
    #[error("Unable to instantiate converter {converter}")]
    ConverterInstantiation {
        converter: String,
        #[source]
        source: BoxError,
    },

    /// 空响应体无法转换为原始类型
    #[error("Cannot convert empty response body to primitive type: {type_name}")]
    PrimitiveConversion { type_name: String },

    /// 响应体存在但格式错误，或请求体无法编码
    #[error("Converter {converter} failed to convert body")]
    Conversion {
        converter: String,
        #[source]
        source: BoxError,
    },

    /// 传输层或拦截器在执行调用时失败
    #[error("Failed to make API call: {endpoint}")]
    HttpCall {
        endpoint: String,
        #[source]
        source: BoxError,
    },
}

impl DuetError {
    /// 构造参数非法错误
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        DuetError::InvalidArgument(message.into())
    }

    /// 构造转换失败错误
    pub fn conversion(converter: impl Into<String>, source: impl Into<BoxError>) -> Self {
        DuetError::Conversion {
            converter: converter.into(),
            source: source.into(),
        }
    }

    /// 构造调用失败错误，保留原始原因
    pub fn http_call(endpoint: impl Into<String>, source: anyhow::Error) -> Self {
        DuetError::HttpCall {
            endpoint: endpoint.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_unsupported_type_message() {
        let error = DuetError::UnsupportedType {
            converter: "ByteArrayConverter".to_string(),
            actual: "alloc::string::String".to_string(),
            expected: "alloc::vec::Vec<u8>".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Unsupported type for converter ByteArrayConverter\nReceived: alloc::string::String\nExpected: alloc::vec::Vec<u8>\n"
        );
    }

    #[test]
    fn test_primitive_conversion_message() {
        let error = DuetError::PrimitiveConversion {
            type_name: "i32".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Cannot convert empty response body to primitive type: i32"
        );
    }

    #[test]
    fn test_http_call_keeps_source() {
        let error = DuetError::http_call("GET /users", anyhow::anyhow!("connection refused"));
        assert_eq!(error.to_string(), "Failed to make API call: GET /users");
        let source = error.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("connection refused"));
    }
}
