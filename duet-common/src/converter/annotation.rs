use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::converter::{BodyType, Converter};
use crate::error::{DuetError, Result};
use crate::header::ContentType;

type ConverterFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn Converter>> + Send + Sync>;

/// 注解中声明的转换器类
///
/// 记录转换器的类型标识和构造方式，实例在首次使用时创建并缓存。
#[derive(Clone)]
pub struct ConverterClass {
    id: TypeId,
    name: &'static str,
    factory: ConverterFactory,
}

impl ConverterClass {
    /// 通过 `Default` 构造的转换器
    pub fn of<C>() -> Self
    where
        C: Converter + Default + 'static,
    {
        ConverterClass {
            id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
            factory: Arc::new(|| Ok(Arc::new(C::default()) as Arc<dyn Converter>)),
        }
    }

    /// 构造可能失败的转换器，失败会在解析时表现为 `ConverterInstantiation`
    pub fn with_factory<C, F>(factory: F) -> Self
    where
        C: Converter + 'static,
        F: Fn() -> anyhow::Result<C> + Send + Sync + 'static,
    {
        ConverterClass {
            id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
            factory: Arc::new(move || factory().map(|c| Arc::new(c) as Arc<dyn Converter>)),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 创建新的转换器实例
    pub fn instantiate(&self) -> Result<Arc<dyn Converter>> {
        (self.factory)().map_err(|e| DuetError::ConverterInstantiation {
            converter: self.name.to_string(),
            source: e.into(),
        })
    }
}

impl PartialEq for ConverterClass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConverterClass {}

impl fmt::Debug for ConverterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConverterClass").field(&self.name).finish()
    }
}

/// "使用此转换器"注解
///
/// `body_types` 为空表示适用于任意消息体类型。
#[derive(Debug, Clone)]
pub struct ConverterAnnotation {
    class: ConverterClass,
    body_types: Vec<BodyType>,
}

impl ConverterAnnotation {
    pub fn new(class: ConverterClass) -> Self {
        ConverterAnnotation {
            class,
            body_types: Vec::new(),
        }
    }

    /// 限定只对指定的消息体类型生效
    pub fn for_types(class: ConverterClass, body_types: impl IntoIterator<Item = BodyType>) -> Self {
        ConverterAnnotation {
            class,
            body_types: body_types.into_iter().collect(),
        }
    }

    pub fn class(&self) -> &ConverterClass {
        &self.class
    }

    pub fn body_types(&self) -> &[BodyType] {
        &self.body_types
    }

    pub fn applies_to(&self, body_type: BodyType) -> bool {
        self.body_types.is_empty() || self.body_types.contains(&body_type)
    }
}

/// 接口方法上的注解信息
///
/// 由 `#[get]`、`#[post]` 等宏生成，也可以手工构造。
#[derive(Debug, Clone, Default)]
pub struct CallAnnotations {
    endpoint_info: Option<String>,
    content_type: ContentType,
    request_converters: Vec<ConverterAnnotation>,
    response_converters: Vec<ConverterAnnotation>,
}

impl CallAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// 端点描述，用于日志与报告
    pub fn with_endpoint_info(mut self, endpoint_info: impl Into<String>) -> Self {
        self.endpoint_info = Some(endpoint_info.into());
        self
    }

    /// 声明的请求 Content-Type
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_request_converter(mut self, annotation: ConverterAnnotation) -> Self {
        self.request_converters.push(annotation);
        self
    }

    pub fn with_response_converter(mut self, annotation: ConverterAnnotation) -> Self {
        self.response_converters.push(annotation);
        self
    }

    /// 同时作用于请求与响应的转换器
    pub fn with_converter(self, annotation: ConverterAnnotation) -> Self {
        self.with_request_converter(annotation.clone())
            .with_response_converter(annotation)
    }

    pub fn endpoint_info(&self) -> Option<&str> {
        self.endpoint_info
            .as_deref()
            .filter(|info| !info.trim().is_empty())
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn request_converters(&self) -> &[ConverterAnnotation] {
        &self.request_converters
    }

    pub fn response_converters(&self) -> &[ConverterAnnotation] {
        &self.response_converters
    }
}

/// 请求体参数上的注解信息
#[derive(Debug, Clone, Default)]
pub struct ParameterAnnotations {
    converters: Vec<ConverterAnnotation>,
}

impl ParameterAnnotations {
    pub const EMPTY: ParameterAnnotations = ParameterAnnotations {
        converters: Vec::new(),
    };

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_converter(mut self, annotation: ConverterAnnotation) -> Self {
        self.converters.push(annotation);
        self
    }

    pub fn converters(&self) -> &[ConverterAnnotation] {
        &self.converters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ByteArrayConverter, JsonConverter};

    struct Broken;

    impl Converter for Broken {
        fn encode(
            &self,
            _value: &dyn crate::converter::RequestValue,
            _ctx: &crate::converter::EncodeContext<'_>,
        ) -> Result<Option<crate::converter::Body>> {
            Ok(None)
        }

        fn decode(
            &self,
            _body: Option<&crate::converter::Body>,
            _ctx: &crate::converter::DecodeContext<'_>,
        ) -> Result<Option<Box<dyn std::any::Any + Send>>> {
            Ok(None)
        }
    }

    #[test]
    fn test_converter_class_identity() {
        assert_eq!(ConverterClass::of::<JsonConverter>(), ConverterClass::of::<JsonConverter>());
        assert_ne!(ConverterClass::of::<JsonConverter>(), ConverterClass::of::<ByteArrayConverter>());
    }

    #[test]
    fn test_instantiation_failure() {
        let class = ConverterClass::with_factory::<Broken, _>(|| anyhow::bail!("missing key store"));
        let error = class.instantiate().err().unwrap();
        assert!(matches!(error, DuetError::ConverterInstantiation { ref converter, .. } if converter.ends_with("Broken")));
        assert!(std::error::Error::source(&error).unwrap().to_string().contains("missing key store"));
    }

    #[test]
    fn test_annotation_applies_to() {
        let any = ConverterAnnotation::new(ConverterClass::of::<JsonConverter>());
        assert!(any.applies_to(BodyType::of::<String>()));

        let bytes_only = ConverterAnnotation::for_types(
            ConverterClass::of::<ByteArrayConverter>(),
            [BodyType::of::<Vec<u8>>()],
        );
        assert!(bytes_only.applies_to(BodyType::of::<Vec<u8>>()));
        assert!(!bytes_only.applies_to(BodyType::of::<String>()));
    }

    #[test]
    fn test_blank_endpoint_info_is_ignored() {
        let annotations = CallAnnotations::new().with_endpoint_info("  ");
        assert_eq!(annotations.endpoint_info(), None);
        let annotations = CallAnnotations::new().with_endpoint_info("List users");
        assert_eq!(annotations.endpoint_info(), Some("List users"));
    }
}
