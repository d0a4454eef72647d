//! 按类型匹配的内置转换器
//!
//! 字节、文件与原始消息体的线上表示与 Content-Type 无关，默认注册在原始类型表中；
//! 文本标量注册在兜底类型表中，只有 MIME 表未命中时才按文本处理。

use std::any::Any;
use std::io::Write;
use std::path::PathBuf;

use crate::converter::{
    Body, BodyType, Converter, DecodeContext, EncodeContext, RequestValue, assert_supported_type,
    boxed, empty_body_value, is_force_null_body, text_value,
};
use crate::error::{DuetError, Result};
use crate::header::ContentType;
use crate::model::{RawBody, ResourceFile};

macro_rules! scalar_types {
    ($mac:ident) => {
        $mac!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64)
    };
}

/// 字节数组转换器，原样收发 `Vec<u8>`
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteArrayConverter;

impl Converter for ByteArrayConverter {
    fn encode(&self, value: &dyn RequestValue, ctx: &EncodeContext<'_>) -> Result<Option<Body>> {
        assert_supported_type(self.name(), value.body_type(), &[BodyType::of::<Vec<u8>>()])?;
        let Some(bytes) = value.as_any().downcast_ref::<Vec<u8>>() else {
            return Ok(None);
        };
        let content_type = ctx.content_type_or(ContentType::APP_OCTET_STREAM);
        Ok(Some(Body::new(content_type, bytes.clone())))
    }

    fn decode(
        &self,
        body: Option<&Body>,
        ctx: &DecodeContext<'_>,
    ) -> Result<Option<Box<dyn Any + Send>>> {
        assert_supported_type(self.name(), ctx.target.body_type(), &[BodyType::of::<Vec<u8>>()])?;
        Ok(body.and_then(|body| boxed(body.bytes().to_vec())))
    }
}

/// 文本标量转换器
///
/// 支持 `String`、`&'static str`、`bool`、`char` 以及所有整数和浮点类型，
/// 以文本形式收发。
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarConverter;

impl ScalarConverter {
    /// 支持的全部类型
    pub fn supported_types() -> Vec<BodyType> {
        macro_rules! body_types {
            ($($ty:ty),*) => { vec![$(BodyType::of::<$ty>()),*] };
        }

        let mut types = vec![BodyType::of::<String>(), BodyType::of::<&'static str>()];
        types.extend(scalar_types!(body_types));
        types
    }

    fn to_text(value: &dyn RequestValue) -> Option<String> {
        if let Some(text) = text_value(value) {
            return Some(text.to_string());
        }
        let any = value.as_any();
        macro_rules! display {
            ($($ty:ty),*) => {
                $(
                    if let Some(value) = any.downcast_ref::<$ty>() {
                        return Some(value.to_string());
                    }
                )*
            };
        }
        scalar_types!(display);
        None
    }

    fn parse(&self, target: BodyType, text: &str) -> Result<Box<dyn Any + Send>> {
        let converter = self.name();
        if target == BodyType::of::<String>() {
            return Ok(Box::new(text.to_string()));
        }
        if target == BodyType::of::<bool>() {
            return match text.trim() {
                t if t.eq_ignore_ascii_case("true") => Ok(Box::new(true)),
                t if t.eq_ignore_ascii_case("false") => Ok(Box::new(false)),
                other => Err(DuetError::conversion(
                    converter,
                    format!("Boolean conversion error:\nexpected true/false\nbut was '{}'", other),
                )),
            };
        }

        macro_rules! parse_as {
            ($($ty:ty),*) => {
                $(
                    if target == BodyType::of::<$ty>() {
                        return text
                            .trim()
                            .parse::<$ty>()
                            .map(|value| Box::new(value) as Box<dyn Any + Send>)
                            .map_err(|e| {
                                DuetError::conversion(
                                    converter,
                                    format!("{} conversion error for '{}': {}", stringify!($ty), text, e),
                                )
                            });
                    }
                )*
            };
        }
        scalar_types!(parse_as);

        Err(DuetError::UnsupportedType {
            converter: converter.to_string(),
            actual: target.name().to_string(),
            expected: "scalar type".to_string(),
        })
    }
}

impl Converter for ScalarConverter {
    fn encode(&self, value: &dyn RequestValue, ctx: &EncodeContext<'_>) -> Result<Option<Body>> {
        assert_supported_type(self.name(), value.body_type(), &Self::supported_types())?;
        if is_force_null_body(value) {
            return Ok(None);
        }
        let Some(text) = Self::to_text(value) else {
            return Ok(None);
        };
        let content_type = ctx.content_type_or(ContentType::TEXT_PLAIN_UTF8);
        Ok(Some(Body::new(content_type, text.into_bytes())))
    }

    fn decode(
        &self,
        body: Option<&Body>,
        ctx: &DecodeContext<'_>,
    ) -> Result<Option<Box<dyn Any + Send>>> {
        let target = ctx.target.body_type();
        assert_supported_type(self.name(), target, &Self::supported_types())?;
        match body {
            Some(body) if !body.is_empty() => self.parse(target, &body.text()).map(Some),
            _ => empty_body_value(target),
        }
    }
}

/// [`RawBody`] 转换器
#[derive(Debug, Default, Clone, Copy)]
pub struct RawBodyConverter;

impl Converter for RawBodyConverter {
    fn encode(&self, value: &dyn RequestValue, ctx: &EncodeContext<'_>) -> Result<Option<Body>> {
        assert_supported_type(self.name(), value.body_type(), &[BodyType::of::<RawBody>()])?;
        let bytes = value
            .as_any()
            .downcast_ref::<RawBody>()
            .and_then(RawBody::bytes);
        Ok(bytes.map(|bytes| {
            Body::new(ctx.content_type_or(ContentType::APP_OCTET_STREAM), bytes.to_vec())
        }))
    }

    fn decode(
        &self,
        body: Option<&Body>,
        ctx: &DecodeContext<'_>,
    ) -> Result<Option<Box<dyn Any + Send>>> {
        assert_supported_type(self.name(), ctx.target.body_type(), &[BodyType::of::<RawBody>()])?;
        let raw = match body {
            Some(body) => RawBody::new(body.bytes()),
            None => RawBody::nullable(),
        };
        Ok(boxed(raw))
    }
}

/// [`ResourceFile`] 转换器，仅用于请求体
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceFileConverter;

impl Converter for ResourceFileConverter {
    fn encode(&self, value: &dyn RequestValue, ctx: &EncodeContext<'_>) -> Result<Option<Body>> {
        assert_supported_type(self.name(), value.body_type(), &[BodyType::of::<ResourceFile>()])?;
        let Some(resource) = value.as_any().downcast_ref::<ResourceFile>() else {
            return Ok(None);
        };
        let content_type = match resource.content_type() {
            Some(content_type) => content_type.clone(),
            None => ctx.content_type_or(ContentType::APP_OCTET_STREAM),
        };
        Ok(Some(Body::new(content_type, resource.bytes()?)))
    }

    fn decode(
        &self,
        _body: Option<&Body>,
        ctx: &DecodeContext<'_>,
    ) -> Result<Option<Box<dyn Any + Send>>> {
        assert_supported_type(self.name(), ctx.target.body_type(), &[BodyType::of::<ResourceFile>()])?;
        Err(DuetError::conversion(
            self.name(),
            "It is forbidden to use the ResourceFile type to convert the response body.",
        ))
    }
}

/// 文件转换器
///
/// 请求时发送 `PathBuf` 指向的文件内容；响应时把消息体写入临时文件并返回其路径。
#[derive(Debug, Default, Clone, Copy)]
pub struct FileConverter;

impl Converter for FileConverter {
    fn encode(&self, value: &dyn RequestValue, ctx: &EncodeContext<'_>) -> Result<Option<Body>> {
        assert_supported_type(self.name(), value.body_type(), &[BodyType::of::<PathBuf>()])?;
        let Some(path) = value.as_any().downcast_ref::<PathBuf>() else {
            return Ok(None);
        };
        if !path.exists() {
            return Err(DuetError::conversion(
                self.name(),
                format!("Request body file not exists: {}", path.display()),
            ));
        }
        if !path.is_file() {
            return Err(DuetError::conversion(
                self.name(),
                format!("Request body file is not a readable file: {}", path.display()),
            ));
        }
        let bytes = std::fs::read(path).map_err(|e| DuetError::conversion(self.name(), e))?;
        Ok(Some(Body::new(
            ctx.content_type_or(ContentType::APP_OCTET_STREAM),
            bytes,
        )))
    }

    fn decode(
        &self,
        body: Option<&Body>,
        ctx: &DecodeContext<'_>,
    ) -> Result<Option<Box<dyn Any + Send>>> {
        assert_supported_type(self.name(), ctx.target.body_type(), &[BodyType::of::<PathBuf>()])?;
        let Some(body) = body else {
            return Ok(None);
        };
        let mut file = tempfile::Builder::new()
            .prefix("duet-body-")
            .tempfile()
            .map_err(|e| DuetError::conversion(self.name(), e))?;
        file.write_all(body.bytes())
            .map_err(|e| DuetError::conversion(self.name(), e))?;
        let (_, path) = file
            .keep()
            .map_err(|e| DuetError::conversion(self.name(), e))?;
        log::debug!("Response body written to {}", path.display());
        Ok(boxed(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{CallAnnotations, ParameterAnnotations, TargetType};

    fn encode_with(
        converter: &dyn Converter,
        value: &dyn RequestValue,
        content_type: &ContentType,
    ) -> Result<Option<Body>> {
        let call = CallAnnotations::new();
        let ctx = EncodeContext {
            content_type,
            parameter: &ParameterAnnotations::EMPTY,
            call: &call,
        };
        converter.encode(value, &ctx)
    }

    fn decode_as<T>(converter: &dyn Converter, body: Option<&Body>) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        let call = CallAnnotations::new();
        let content_type = body.map(|b| b.content_type().clone()).unwrap_or_default();
        let ctx = DecodeContext {
            target: TargetType::of::<T>(),
            content_type: &content_type,
            call: &call,
        };
        Ok(converter
            .decode(body, &ctx)?
            .map(|value| *value.downcast::<T>().unwrap()))
    }

    #[test]
    fn test_byte_array_round_trip() {
        let bytes = vec![0u8, 1, 2, 254, 255];
        let body = encode_with(&ByteArrayConverter, &bytes, &ContentType::NULL)
            .unwrap()
            .unwrap();
        assert_eq!(body.content_type(), &ContentType::APP_OCTET_STREAM);

        let decoded: Option<Vec<u8>> = decode_as(&ByteArrayConverter, Some(&body)).unwrap();
        assert_eq!(decoded, Some(bytes));
    }

    #[test]
    fn test_byte_array_rejects_other_types() {
        let error = encode_with(&ByteArrayConverter, &"text", &ContentType::NULL).unwrap_err();
        assert!(matches!(error, DuetError::UnsupportedType { .. }));
    }

    #[test]
    fn test_scalar_encode_uses_declared_content_type() {
        let body = encode_with(&ScalarConverter, &"hello".to_string(), &ContentType::TEXT_PLAIN)
            .unwrap()
            .unwrap();
        assert_eq!(body.bytes(), b"hello");
        assert_eq!(body.content_type(), &ContentType::TEXT_PLAIN);

        let body = encode_with(&ScalarConverter, &42i64, &ContentType::NULL)
            .unwrap()
            .unwrap();
        assert_eq!(body.bytes(), b"42");
        assert_eq!(body.content_type(), &ContentType::TEXT_PLAIN_UTF8);
    }

    #[test]
    fn test_scalar_force_null_body() {
        let body = encode_with(&ScalarConverter, &crate::converter::NULL_BODY_VALUE, &ContentType::NULL)
            .unwrap();
        assert!(body.is_none());
    }

    #[test]
    fn test_scalar_decode() {
        let body = Body::new(ContentType::TEXT_PLAIN, "  17 ");
        assert_eq!(decode_as::<u32>(&ScalarConverter, Some(&body)).unwrap(), Some(17));

        let body = Body::new(ContentType::TEXT_PLAIN, "TRUE");
        assert_eq!(decode_as::<bool>(&ScalarConverter, Some(&body)).unwrap(), Some(true));

        let body = Body::new(ContentType::TEXT_PLAIN, "hello");
        assert_eq!(
            decode_as::<String>(&ScalarConverter, Some(&body)).unwrap(),
            Some("hello".to_string())
        );
    }

    #[test]
    fn test_scalar_decode_malformed() {
        let body = Body::new(ContentType::TEXT_PLAIN, "yes");
        let error = decode_as::<bool>(&ScalarConverter, Some(&body)).unwrap_err();
        assert!(matches!(error, DuetError::Conversion { .. }));
    }

    #[test]
    fn test_scalar_empty_body() {
        let empty = Body::new(ContentType::TEXT_PLAIN, Vec::new());
        assert_eq!(decode_as::<String>(&ScalarConverter, Some(&empty)).unwrap(), None);
        assert_eq!(decode_as::<String>(&ScalarConverter, None).unwrap(), None);

        let error = decode_as::<i32>(&ScalarConverter, None).unwrap_err();
        assert!(matches!(error, DuetError::PrimitiveConversion { type_name } if type_name == "i32"));
    }

    #[test]
    fn test_raw_body() {
        let body = encode_with(&RawBodyConverter, &RawBody::nullable(), &ContentType::NULL).unwrap();
        assert!(body.is_none());

        let decoded: Option<RawBody> = decode_as(&RawBodyConverter, None).unwrap();
        assert_eq!(decoded, Some(RawBody::nullable()));

        let body = Body::new(ContentType::TEXT_PLAIN, "raw");
        let decoded: Option<RawBody> = decode_as(&RawBodyConverter, Some(&body)).unwrap();
        assert_eq!(decoded, Some(RawBody::from("raw")));
    }

    #[test]
    fn test_file_round_trip() {
        let body = Body::new(ContentType::APP_OCTET_STREAM, "file content");
        let path: PathBuf = decode_as(&FileConverter, Some(&body)).unwrap().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"file content");

        let encoded = encode_with(&FileConverter, &path, &ContentType::TEXT_PLAIN)
            .unwrap()
            .unwrap();
        assert_eq!(encoded.bytes(), b"file content");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_file_missing() {
        let path = PathBuf::from("/definitely/not/here.bin");
        let error = encode_with(&FileConverter, &path, &ContentType::NULL).unwrap_err();
        assert!(matches!(error, DuetError::Conversion { .. }));
    }

    #[test]
    fn test_resource_file_response_is_forbidden() {
        let body = Body::new(ContentType::TEXT_PLAIN, "x");
        let call = CallAnnotations::new();
        let ctx = DecodeContext {
            target: TargetType::of::<ResourceFile>(),
            content_type: &ContentType::TEXT_PLAIN,
            call: &call,
        };
        assert!(ResourceFileConverter.decode(Some(&body), &ctx).is_err());
    }
}
