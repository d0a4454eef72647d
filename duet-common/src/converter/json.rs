use std::any::Any;

use crate::converter::{
    Body, Converter, DecodeContext, EncodeContext, RequestValue, empty_body_value,
    is_force_null_body, is_force_null_json,
};
use crate::error::{DuetError, Result};
use crate::header::ContentType;

/// 基于 serde_json 的转换器
///
/// 默认注册在 MIME 表中的 `application/json` 下，可处理任意 serde 类型。
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonConverter;

impl Converter for JsonConverter {
    fn encode(&self, value: &dyn RequestValue, ctx: &EncodeContext<'_>) -> Result<Option<Body>> {
        if is_force_null_body(value) {
            return Ok(None);
        }
        let content_type = ctx.content_type_or(ContentType::APP_JSON_UTF8);
        if is_force_null_json(value) {
            return Ok(Some(Body::new(content_type, b"null".to_vec())));
        }
        let bytes = value
            .to_json()
            .map_err(|e| DuetError::conversion(self.name(), e))?;
        Ok(Some(Body::new(content_type, bytes)))
    }

    fn decode(
        &self,
        body: Option<&Body>,
        ctx: &DecodeContext<'_>,
    ) -> Result<Option<Box<dyn Any + Send>>> {
        let target = ctx.target.body_type();
        match body {
            Some(body) if !body.bytes().iter().all(u8::is_ascii_whitespace) => ctx
                .target
                .from_json(body.bytes())
                .map(Some)
                .map_err(|e| DuetError::conversion(self.name(), e)),
            _ => empty_body_value(target),
        }
    }
}
