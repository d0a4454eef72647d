use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use glob::Pattern;
use serde::de::DeserializeOwned;

use crate::converter::{
    Body, BodyType, ByteArrayConverter, CallAnnotations, Converter, ConverterAnnotation,
    ConverterClass, DecodeContext, Direction, EncodeContext, FileConverter,
    JsonConverter, ParameterAnnotations, RawBodyConverter, RequestValue, ResourceFileConverter,
    ScalarConverter, TargetType, empty_body_value,
};
use crate::cache::InstanceCache;
use crate::error::{DuetError, Result};
use crate::header::ContentType;
use crate::model::{RawBody, ResourceFile};

/// 单个方向上的注册表
///
/// `fallback` 与 `raw` 同样按类型索引，但排在 MIME 表之后查找。
#[derive(Default)]
struct ConverterTables {
    raw: HashMap<BodyType, Arc<dyn Converter>>,
    packages: Vec<PackageEntry>,
    mime: HashMap<ContentType, Arc<dyn Converter>>,
    fallback: HashMap<BodyType, Arc<dyn Converter>>,
}

struct PackageEntry {
    pattern: Pattern,
    converter: Arc<dyn Converter>,
}

/// 转换器注册表
///
/// 按固定顺序解析转换器：注解 → 原始类型 → 包 → MIME，先命中者生效；
/// 四步都未命中时再查兜底类型表（文本标量）。
/// 请求与响应各有一套表，解析算法完全相同。
///
/// 注册只应发生在客户端初始化阶段，之后注册表作为只读状态在线程间共享；
/// 注解转换器的实例缓存是唯一的内部可变状态。
pub struct ConverterRegistry {
    request: ConverterTables,
    response: ConverterTables,
    cache: InstanceCache<dyn Converter>,
}

impl ConverterRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        ConverterRegistry {
            request: ConverterTables::default(),
            response: ConverterTables::default(),
            cache: InstanceCache::new("annotated converter"),
        }
    }

    /// 创建带有内置转换器的注册表
    ///
    /// 原始类型表：`Vec<u8>`、[`RawBody`]、[`ResourceFile`]、`PathBuf`；
    /// MIME 表：`application/json`（含与不含 `charset=utf-8`）；
    /// 兜底类型表：`String`、`&'static str` 与全部原始类型。
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register_raw_converter(Arc::new(ByteArrayConverter), &[BodyType::of::<Vec<u8>>()])
            .register_raw_converter(Arc::new(RawBodyConverter), &[BodyType::of::<RawBody>()])
            .register_raw_converter(Arc::new(ResourceFileConverter), &[BodyType::of::<ResourceFile>()])
            .register_raw_converter(Arc::new(FileConverter), &[BodyType::of::<PathBuf>()])
            .register_mime_converter(
                Arc::new(JsonConverter),
                &[ContentType::APP_JSON, ContentType::APP_JSON_UTF8],
            )
            .register_fallback_converter(Arc::new(ScalarConverter), &ScalarConverter::supported_types());
        registry
    }

    fn tables(&self, direction: Direction) -> &ConverterTables {
        match direction {
            Direction::Request => &self.request,
            Direction::Response => &self.response,
        }
    }

    fn tables_mut(&mut self, direction: Direction) -> &mut ConverterTables {
        match direction {
            Direction::Request => &mut self.request,
            Direction::Response => &mut self.response,
        }
    }

    // ---------------------------------------------------------------------
    // 注册
    // ---------------------------------------------------------------------

    /// 按原始类型注册请求与响应转换器，同一类型重复注册时后者覆盖前者
    pub fn register_raw_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        body_types: &[BodyType],
    ) -> &mut Self {
        self.register_raw_request_converter(Arc::clone(&converter), body_types)
            .register_raw_response_converter(converter, body_types)
    }

    pub fn register_raw_request_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        body_types: &[BodyType],
    ) -> &mut Self {
        self.insert_raw(Direction::Request, converter, body_types)
    }

    pub fn register_raw_response_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        body_types: &[BodyType],
    ) -> &mut Self {
        self.insert_raw(Direction::Response, converter, body_types)
    }

    fn insert_raw(
        &mut self,
        direction: Direction,
        converter: Arc<dyn Converter>,
        body_types: &[BodyType],
    ) -> &mut Self {
        for body_type in body_types {
            log::debug!(
                "Register raw {} converter {} for type {}",
                direction,
                converter.name(),
                body_type
            );
            self.tables_mut(direction)
                .raw
                .insert(*body_type, Arc::clone(&converter));
        }
        self
    }

    /// 按类型注册兜底转换器，只在 MIME 表之后才会被查找
    ///
    /// 用于文本标量这类"没有更具体的转换器时才按文本处理"的类型，
    /// 这样 `application/json` 下的 `String` 仍然走 JSON 转换器。
    pub fn register_fallback_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        body_types: &[BodyType],
    ) -> &mut Self {
        self.register_fallback_request_converter(Arc::clone(&converter), body_types)
            .register_fallback_response_converter(converter, body_types)
    }

    pub fn register_fallback_request_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        body_types: &[BodyType],
    ) -> &mut Self {
        self.insert_fallback(Direction::Request, converter, body_types)
    }

    pub fn register_fallback_response_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        body_types: &[BodyType],
    ) -> &mut Self {
        self.insert_fallback(Direction::Response, converter, body_types)
    }

    fn insert_fallback(
        &mut self,
        direction: Direction,
        converter: Arc<dyn Converter>,
        body_types: &[BodyType],
    ) -> &mut Self {
        for body_type in body_types {
            log::debug!(
                "Register fallback {} converter {} for type {}",
                direction,
                converter.name(),
                body_type
            );
            self.tables_mut(direction)
                .fallback
                .insert(*body_type, Arc::clone(&converter));
        }
        self
    }

    /// 按 Content-Type 注册请求与响应转换器
    ///
    /// 不带 charset 的键同时匹配带任意 charset 的同类型响应。
    pub fn register_mime_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        content_types: &[ContentType],
    ) -> &mut Self {
        self.register_mime_request_converter(Arc::clone(&converter), content_types)
            .register_mime_response_converter(converter, content_types)
    }

    pub fn register_mime_request_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        content_types: &[ContentType],
    ) -> &mut Self {
        self.insert_mime(Direction::Request, converter, content_types)
    }

    pub fn register_mime_response_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        content_types: &[ContentType],
    ) -> &mut Self {
        self.insert_mime(Direction::Response, converter, content_types)
    }

    fn insert_mime(
        &mut self,
        direction: Direction,
        converter: Arc<dyn Converter>,
        content_types: &[ContentType],
    ) -> &mut Self {
        for content_type in content_types {
            log::debug!(
                "Register MIME {} converter {} for {}",
                direction,
                converter.name(),
                content_type
            );
            self.tables_mut(direction)
                .mime
                .insert(content_type.clone(), Arc::clone(&converter));
        }
        self
    }

    /// 按包路径注册请求与响应转换器
    ///
    /// 包路径支持 glob 通配，例如 `my_app::dto` 或 `my_app::*`。
    pub fn register_package_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        packages: &[&str],
    ) -> Result<&mut Self> {
        self.register_package_request_converter(Arc::clone(&converter), packages)?
            .register_package_response_converter(converter, packages)
    }

    pub fn register_package_request_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        packages: &[&str],
    ) -> Result<&mut Self> {
        self.insert_packages(Direction::Request, converter, packages)
    }

    pub fn register_package_response_converter(
        &mut self,
        converter: Arc<dyn Converter>,
        packages: &[&str],
    ) -> Result<&mut Self> {
        self.insert_packages(Direction::Response, converter, packages)
    }

    /// 把 `T` 所在的包注册到转换器上
    pub fn register_package_converter_for<T: ?Sized + 'static>(
        &mut self,
        converter: Arc<dyn Converter>,
    ) -> Result<&mut Self> {
        let body_type = BodyType::of::<T>();
        let package = body_type.package().ok_or_else(|| {
            DuetError::invalid_argument(format!("Type {} is not declared in a package", body_type))
        })?;
        let pattern = Pattern::escape(package);
        self.register_package_converter(converter, &[pattern.as_str()])
    }

    fn insert_packages(
        &mut self,
        direction: Direction,
        converter: Arc<dyn Converter>,
        packages: &[&str],
    ) -> Result<&mut Self> {
        let mut compiled = Vec::with_capacity(packages.len());
        for package in packages {
            if package.trim().is_empty() {
                return Err(DuetError::invalid_argument("Parameter 'package' cannot be blank."));
            }
            let pattern = Pattern::new(package).map_err(|e| {
                DuetError::invalid_argument(format!("Invalid package pattern '{}': {}", package, e))
            })?;
            compiled.push(pattern);
        }

        let tables = self.tables_mut(direction);
        for pattern in compiled {
            log::debug!(
                "Register package {} converter {} for {}",
                direction,
                converter.name(),
                pattern
            );
            tables.packages.retain(|entry| entry.pattern != pattern);
            tables.packages.push(PackageEntry {
                pattern,
                converter: Arc::clone(&converter),
            });
        }
        Ok(self)
    }

    // ---------------------------------------------------------------------
    // 解析
    // ---------------------------------------------------------------------

    /// 解析请求体转换器
    pub fn request_converter(
        &self,
        body_type: BodyType,
        content_type: &ContentType,
        parameter: &ParameterAnnotations,
        call: &CallAnnotations,
    ) -> Result<Arc<dyn Converter>> {
        self.resolve(Direction::Request, body_type, content_type, parameter, call)
    }

    /// 解析响应体转换器
    pub fn response_converter(
        &self,
        body_type: BodyType,
        content_type: &ContentType,
        call: &CallAnnotations,
    ) -> Result<Arc<dyn Converter>> {
        self.resolve(
            Direction::Response,
            body_type,
            content_type,
            &ParameterAnnotations::EMPTY,
            call,
        )
    }

    fn resolve(
        &self,
        direction: Direction,
        body_type: BodyType,
        content_type: &ContentType,
        parameter: &ParameterAnnotations,
        call: &CallAnnotations,
    ) -> Result<Arc<dyn Converter>> {
        if let Some(converter) = self.lookup(direction, body_type, parameter, call)? {
            return Ok(converter);
        }
        self.lookup_late(direction, body_type, content_type)
            .ok_or_else(|| self.not_found(direction, body_type, content_type, call))
    }

    /// 后两步：MIME、兜底类型
    fn lookup_late(
        &self,
        direction: Direction,
        body_type: BodyType,
        content_type: &ContentType,
    ) -> Option<Arc<dyn Converter>> {
        if let Some(converter) = self.lookup_mime(direction, content_type) {
            log::debug!("MIME {} converter found for {}", direction, content_type);
            return Some(converter);
        }
        let converter = self.tables(direction).fallback.get(&body_type)?;
        log::debug!("Fallback {} converter found: {}", direction, converter.name());
        Some(Arc::clone(converter))
    }

    /// 前三步：注解、原始类型、包
    fn lookup(
        &self,
        direction: Direction,
        body_type: BodyType,
        parameter: &ParameterAnnotations,
        call: &CallAnnotations,
    ) -> Result<Option<Arc<dyn Converter>>> {
        log::debug!("Definition of {} converter for type {}", direction, body_type);
        if let Some(converter) = self.lookup_annotated(direction, body_type, parameter, call)? {
            log::debug!("Annotated {} converter found: {}", direction, converter.name());
            return Ok(Some(converter));
        }
        let tables = self.tables(direction);
        if let Some(converter) = tables.raw.get(&body_type) {
            log::debug!("Raw {} converter found: {}", direction, converter.name());
            return Ok(Some(Arc::clone(converter)));
        }
        if let Some(converter) = lookup_package(direction, tables, body_type)? {
            log::debug!("Package {} converter found: {}", direction, converter.name());
            return Ok(Some(converter));
        }
        Ok(None)
    }

    fn lookup_annotated(
        &self,
        direction: Direction,
        body_type: BodyType,
        parameter: &ParameterAnnotations,
        call: &CallAnnotations,
    ) -> Result<Option<Arc<dyn Converter>>> {
        let applicable = |annotations: &[ConverterAnnotation]| -> Vec<ConverterClass> {
            let mut classes: Vec<ConverterClass> = Vec::new();
            for annotation in annotations.iter().filter(|a| a.applies_to(body_type)) {
                if !classes.contains(annotation.class()) {
                    classes.push(annotation.class().clone());
                }
            }
            classes
        };

        let mut classes = applicable(parameter.converters());
        if classes.is_empty() {
            classes = applicable(method_converters(direction, call));
        }
        match classes.as_slice() {
            [] => Ok(None),
            [class] => self
                .cache
                .get_or_try_insert_with(class.id(), class.name(), || class.instantiate())
                .map(Some),
            _ => Err(DuetError::ConverterConflict {
                direction,
                body_type: body_type.name().to_string(),
                candidates: candidate_list(classes.iter().map(ConverterClass::name)),
            }),
        }
    }

    fn lookup_mime(
        &self,
        direction: Direction,
        content_type: &ContentType,
    ) -> Option<Arc<dyn Converter>> {
        let mime = &self.tables(direction).mime;
        mime.get(content_type)
            .or_else(|| {
                content_type
                    .charset()
                    .and_then(|_| mime.get(&content_type.without_charset()))
            })
            .cloned()
    }

    fn not_found(
        &self,
        direction: Direction,
        body_type: BodyType,
        content_type: &ContentType,
        call: &CallAnnotations,
    ) -> DuetError {
        log::error!("{} converter not found for type {}", direction, body_type);
        DuetError::ConverterNotFound {
            direction,
            content_type: content_type.clone(),
            body_type: body_type.name().to_string(),
            registered: self.summary(direction, call),
        }
    }

    // ---------------------------------------------------------------------
    // 编解码
    // ---------------------------------------------------------------------

    /// 编码请求体，返回 `None` 表示不发送请求体
    pub fn encode_request(
        &self,
        value: &dyn RequestValue,
        parameter: &ParameterAnnotations,
        call: &CallAnnotations,
    ) -> Result<Option<Body>> {
        let body_type = value.body_type();
        if body_type.is_unit() {
            return Ok(None);
        }
        let content_type = call.content_type();
        let converter = self.request_converter(body_type, content_type, parameter, call)?;
        log::debug!("Request converter found: {}", converter.name());
        let ctx = EncodeContext {
            content_type,
            parameter,
            call,
        };
        converter.encode(value, &ctx)
    }

    /// 解码响应体
    ///
    /// 响应没有消息体且前三步都未命中时不再查找 MIME 表与兜底类型表，直接返回 `None`
    /// （原始类型目标返回 `PrimitiveConversion`）。
    pub fn decode_response<T>(&self, body: Option<&Body>, call: &CallAnnotations) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let target = TargetType::of::<T>();
        let body_type = target.body_type();
        if body_type.is_unit() {
            return Ok(None);
        }
        let content_type = body.map(Body::content_type).cloned().unwrap_or_default();

        let converter = match self.lookup(
            Direction::Response,
            body_type,
            &ParameterAnnotations::EMPTY,
            call,
        )? {
            Some(converter) => converter,
            None if body.is_none() => {
                log::debug!("Response body not present. Nothing to convert.");
                return empty_body_value(body_type).map(|_| None);
            }
            None => self
                .lookup_late(Direction::Response, body_type, &content_type)
                .ok_or_else(|| self.not_found(Direction::Response, body_type, &content_type, call))?,
        };

        let ctx = DecodeContext {
            target,
            content_type: &content_type,
            call,
        };
        let Some(value) = converter.decode(body, &ctx)? else {
            return Ok(None);
        };
        value.downcast::<T>().map(|value| Some(*value)).map_err(|_| {
            DuetError::conversion(
                converter.name(),
                format!("Converted value is not of type {}", body_type),
            )
        })
    }

    // ---------------------------------------------------------------------
    // 诊断
    // ---------------------------------------------------------------------

    /// 列出某个方向上已注册的全部转换器
    pub fn summary(&self, direction: Direction, call: &CallAnnotations) -> String {
        let tables = self.tables(direction);

        let mut annotated: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();
        for annotation in method_converters(direction, call) {
            let keys = annotated.entry(annotation.class().name()).or_default();
            if annotation.body_types().is_empty() {
                keys.insert("<any>".to_string());
            }
            keys.extend(annotation.body_types().iter().map(|t| t.name().to_string()));
        }

        let raw = group(tables.raw.iter().map(|(k, c)| (k.name().to_string(), c)));
        let packages = group(
            tables
                .packages
                .iter()
                .map(|entry| (entry.pattern.to_string(), &entry.converter)),
        );
        let mime = group(tables.mime.iter().map(|(k, c)| (k.to_string(), c)));
        let fallback = group(tables.fallback.iter().map(|(k, c)| (k.name().to_string(), c)));

        let header = match direction {
            Direction::Request => "REQUEST",
            Direction::Response => "RESPONSE",
        };
        format!(
            "SUPPORTED {} CONVERTERS:\n{}\n{}\n{}\n{}\n{}",
            header,
            section("Annotated converters:", &annotated),
            section("Raw converters:", &raw),
            section("Package converters:", &packages),
            section("Content type converters:", &mime),
            section("Fallback type converters:", &fallback),
        )
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Display for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let call = CallAnnotations::default();
        write!(
            f,
            "Converter registry\n\n{}\n\n{}",
            self.summary(Direction::Request, &call),
            self.summary(Direction::Response, &call)
        )
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("request_raw", &self.request.raw.len())
            .field("request_packages", &self.request.packages.len())
            .field("request_mime", &self.request.mime.len())
            .field("request_fallback", &self.request.fallback.len())
            .field("response_raw", &self.response.raw.len())
            .field("response_packages", &self.response.packages.len())
            .field("response_mime", &self.response.mime.len())
            .field("response_fallback", &self.response.fallback.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

fn method_converters(direction: Direction, call: &CallAnnotations) -> &[ConverterAnnotation] {
    match direction {
        Direction::Request => call.request_converters(),
        Direction::Response => call.response_converters(),
    }
}

/// 包匹配：依次尝试外层类型与各泛型参数的包，第一个有唯一命中的包生效
fn lookup_package(
    direction: Direction,
    tables: &ConverterTables,
    body_type: BodyType,
) -> Result<Option<Arc<dyn Converter>>> {
    for package in body_type.packages() {
        let mut matched: Vec<&Arc<dyn Converter>> = Vec::new();
        for entry in tables.packages.iter().filter(|e| e.pattern.matches(package)) {
            if !matched.iter().any(|c| same_converter(c, &entry.converter)) {
                matched.push(&entry.converter);
            }
        }
        match matched.as_slice() {
            [] => continue,
            [converter] => return Ok(Some(Arc::clone(converter))),
            _ => {
                return Err(DuetError::ConverterConflict {
                    direction,
                    body_type: body_type.name().to_string(),
                    candidates: candidate_list(matched.iter().map(|c| c.name())),
                });
            }
        }
    }
    Ok(None)
}

fn same_converter(a: &Arc<dyn Converter>, b: &Arc<dyn Converter>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn candidate_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names
        .map(|name| format!("  * {}", name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn group<'a>(
    entries: impl Iterator<Item = (String, &'a Arc<dyn Converter>)>,
) -> BTreeMap<&'static str, BTreeSet<String>> {
    let mut grouped: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();
    for (key, converter) in entries {
        grouped.entry(converter.name()).or_default().insert(key);
    }
    grouped
}

fn section(title: &str, entries: &BTreeMap<&'static str, BTreeSet<String>>) -> String {
    if entries.is_empty() {
        return format!("{} <absent>", title);
    }
    let lines = entries
        .iter()
        .map(|(name, keys)| {
            let mut line = name.to_string();
            for key in keys {
                line.push_str("\n    ");
                line.push_str(key);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n{}", title, lines)
}
