use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DuetError, Result};
use crate::header::ContentType;

/// 以文件内容作为请求体的资源文件
///
/// 相对路径按 `CARGO_MANIFEST_DIR` 解析（存在时），便于在测试中引用仓库内的资源。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFile {
    path: PathBuf,
    content_type: Option<ContentType>,
}

impl ResourceFile {
    /// 创建资源文件，文件不存在时返回错误
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = resolve(path.as_ref());
        if !path.is_file() {
            return Err(DuetError::invalid_argument(format!(
                "Resource not exists: {}",
                path.display()
            )));
        }
        Ok(ResourceFile {
            path,
            content_type: None,
        })
    }

    /// 指定发送时使用的 Content-Type，覆盖方法上声明的类型
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    pub fn bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| {
            DuetError::invalid_argument(format!(
                "Resource not readable: {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    pub fn read_to_string(&self) -> Result<String> {
        self.bytes()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn resolve(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::var_os("CARGO_MANIFEST_DIR") {
        Some(root) if Path::new(&root).join(path).exists() => Path::new(&root).join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_resource() {
        let error = ResourceFile::new("does/not/exist.json").unwrap_err();
        assert!(error.to_string().starts_with("Resource not exists: "));
    }

    #[test]
    fn test_read_resource() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"id\":1}").unwrap();

        let resource = ResourceFile::new(file.path()).unwrap();
        assert_eq!(resource.bytes().unwrap(), b"{\"id\":1}");
        assert_eq!(resource.read_to_string().unwrap(), "{\"id\":1}");
        assert!(resource.content_type().is_none());
    }

    #[test]
    fn test_relative_to_manifest_dir() {
        let resource = ResourceFile::new("Cargo.toml").unwrap();
        assert!(resource.path().is_absolute());
    }
}
