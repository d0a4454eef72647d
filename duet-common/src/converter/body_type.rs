use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;

/// 类型的大类，决定空响应体的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `()`，对应槽位永远不做转换
    Unit,
    /// bool、char、整数与浮点数，不能从空响应体得到
    Primitive,
    /// 其余所有类型
    Other,
}

/// 请求或响应体的声明类型
///
/// 相等与哈希只看 `TypeId`，名称仅用于包匹配和诊断输出。
#[derive(Clone, Copy)]
pub struct BodyType {
    id: TypeId,
    name: &'static str,
    kind: BodyKind,
}

impl BodyType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        BodyType {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind: kind_of::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn is_unit(&self) -> bool {
        self.kind == BodyKind::Unit
    }

    pub fn is_primitive(&self) -> bool {
        self.kind == BodyKind::Primitive
    }

    /// 外层类型所在的模块路径，例如 `my_app::dto::User` 得到 `my_app::dto`
    pub fn package(&self) -> Option<&'static str> {
        let (outer, _) = split_generics(self.name);
        package_of(outer)
    }

    /// 包匹配的候选路径：先外层类型，再按顺序展开泛型参数
    ///
    /// `alloc::vec::Vec<my_app::dto::User>` 得到 `["alloc::vec", "my_app::dto"]`。
    pub fn packages(&self) -> Vec<&'static str> {
        let mut packages = Vec::new();
        collect_packages(self.name, &mut packages);
        packages
    }
}

impl PartialEq for BodyType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BodyType {}

impl Hash for BodyType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn kind_of<T: ?Sized + 'static>() -> BodyKind {
    macro_rules! type_ids {
        ($($ty:ty),* $(,)?) => { [$(TypeId::of::<$ty>()),*] };
    }

    let id = TypeId::of::<T>();
    if id == TypeId::of::<()>() {
        return BodyKind::Unit;
    }
    let primitives = type_ids![
        bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    ];
    if primitives.contains(&id) {
        BodyKind::Primitive
    } else {
        BodyKind::Other
    }
}

/// 拆分 `outer<arg1, arg2>`，只在最外层的逗号处切分参数
fn split_generics(name: &'static str) -> (&'static str, Vec<&'static str>) {
    let name = name.trim();
    let Some(start) = name.find('<') else {
        return (name, Vec::new());
    };
    let Some(end) = name.rfind('>') else {
        return (name, Vec::new());
    };
    if end <= start {
        return (name, Vec::new());
    }

    let inner = &name[start + 1..end];
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut from = 0usize;
    for (index, ch) in inner.char_indices() {
        match ch {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(inner[from..index].trim());
                from = index + 1;
            }
            _ => {}
        }
    }
    let last = inner[from..].trim();
    if !last.is_empty() {
        args.push(last);
    }
    (&name[..start], args)
}

fn package_of(path: &'static str) -> Option<&'static str> {
    let path = path.trim_start_matches('&').trim();
    if path.starts_with('(') || path.starts_with('[') {
        return None;
    }
    path.rsplit_once("::").map(|(package, _)| package)
}

fn collect_packages(name: &'static str, packages: &mut Vec<&'static str>) {
    let (outer, args) = split_generics(name);
    if let Some(package) = package_of(outer) {
        if !packages.contains(&package) {
            packages.push(package);
        }
    }
    for arg in args {
        collect_packages(arg, packages);
    }
}

/// 响应体的目标类型
///
/// 携带 JSON 反序列化钩子，使按内容协商选出的转换器无需反射即可产出 `T`。
#[derive(Clone, Copy)]
pub struct TargetType {
    body_type: BodyType,
    from_json: fn(&[u8]) -> serde_json::Result<Box<dyn Any + Send>>,
}

impl TargetType {
    pub fn of<T: DeserializeOwned + Send + 'static>() -> Self {
        fn decode<T: DeserializeOwned + Send + 'static>(
            bytes: &[u8],
        ) -> serde_json::Result<Box<dyn Any + Send>> {
            serde_json::from_slice::<T>(bytes).map(|value| Box::new(value) as Box<dyn Any + Send>)
        }

        TargetType {
            body_type: BodyType::of::<T>(),
            from_json: decode::<T>,
        }
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// 按目标类型反序列化 JSON 字节
    pub fn from_json(&self, bytes: &[u8]) -> serde_json::Result<Box<dyn Any + Send>> {
        (self.from_json)(bytes)
    }
}

impl fmt::Debug for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetType").field(&self.body_type).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod dto {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        pub struct User {
            pub name: String,
        }
    }

    #[test]
    fn test_kind() {
        assert_eq!(BodyType::of::<()>().kind(), BodyKind::Unit);
        assert_eq!(BodyType::of::<i32>().kind(), BodyKind::Primitive);
        assert_eq!(BodyType::of::<bool>().kind(), BodyKind::Primitive);
        assert_eq!(BodyType::of::<String>().kind(), BodyKind::Other);
        assert_eq!(BodyType::of::<Option<i32>>().kind(), BodyKind::Other);
    }

    #[test]
    fn test_equality_by_type_id() {
        assert_eq!(BodyType::of::<Vec<u8>>(), BodyType::of::<Vec<u8>>());
        assert_ne!(BodyType::of::<Vec<u8>>(), BodyType::of::<Vec<i8>>());
    }

    #[test]
    fn test_package_of_plain_type() {
        let body_type = BodyType::of::<dto::User>();
        assert!(body_type.package().unwrap().ends_with("body_type::tests::dto"));
        assert_eq!(BodyType::of::<u8>().package(), None);
    }

    #[test]
    fn test_packages_walk_generic_arguments() {
        let packages = BodyType::of::<Vec<dto::User>>().packages();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0], "alloc::vec");
        assert!(packages[1].ends_with("body_type::tests::dto"));
    }

    #[test]
    fn test_split_generics_nested() {
        let (outer, args) = split_generics("std::collections::HashMap<alloc::string::String, alloc::vec::Vec<u8>>");
        assert_eq!(outer, "std::collections::HashMap");
        assert_eq!(args, vec!["alloc::string::String", "alloc::vec::Vec<u8>"]);
    }

    #[test]
    fn test_target_type_from_json() {
        let target = TargetType::of::<dto::User>();
        let value = target.from_json(br#"{"name":"duet"}"#).unwrap();
        let user = value.downcast::<dto::User>().unwrap();
        assert_eq!(user.name, "duet");
    }
}
