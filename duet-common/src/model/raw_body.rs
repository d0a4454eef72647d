use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assertion::SoftAsserter;

const RESPONSE_BODY_MSG: &str = "Response body\n";

/// 原始消息体
///
/// 区分"没有消息体"（`None`）和"空消息体"（长度为 0），
/// 并提供直接作用于字节内容的断言。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawBody {
    bytes: Option<Vec<u8>>,
}

impl RawBody {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        RawBody {
            bytes: Some(bytes.into()),
        }
    }

    /// 没有消息体
    pub fn nullable() -> Self {
        RawBody { bytes: None }
    }

    /// 长度为 0 的消息体
    pub fn empty() -> Self {
        RawBody {
            bytes: Some(Vec::new()),
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// UTF-8 文本形式，没有消息体时返回 None
    pub fn string(&self) -> Option<String> {
        self.bytes
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn is_null_body(&self) -> bool {
        self.bytes.is_none()
    }

    pub fn is_empty_body(&self) -> bool {
        self.bytes.as_ref().is_none_or(|bytes| bytes.is_empty())
    }

    #[track_caller]
    pub fn assert_body_is_not_null(&self) -> &Self {
        if self.is_null_body() {
            panic!("{}Expected: is byte array\n     but: was null\n", RESPONSE_BODY_MSG);
        }
        self
    }

    #[track_caller]
    pub fn assert_body_is_null(&self) -> &Self {
        if let Some(bytes) = &self.bytes {
            panic!(
                "{}Expected: is null\n     but: was array length '{}'\n",
                RESPONSE_BODY_MSG,
                bytes.len()
            );
        }
        self
    }

    #[track_caller]
    pub fn assert_body_is_not_empty(&self) -> &Self {
        if self.is_empty_body() {
            panic!(
                "{}Expected: is not empty byte array\n     but: was {:?}\n",
                RESPONSE_BODY_MSG, self.bytes
            );
        }
        self
    }

    #[track_caller]
    pub fn assert_body_is_empty(&self) -> &Self {
        self.assert_body_is_not_null();
        if !self.is_empty_body() {
            panic!(
                "{}Expected: is empty byte array\n     but: was array length '{}'\n",
                RESPONSE_BODY_MSG,
                self.bytes.as_ref().map_or(0, Vec::len)
            );
        }
        self
    }

    #[track_caller]
    pub fn assert_string_body_is(&self, expected: &str) -> &Self {
        self.assert_body_is_not_null();
        let actual = self.string().unwrap_or_default();
        if actual != expected {
            panic!(
                "{}Expected: '{}'\n     but: was '{}'\n",
                RESPONSE_BODY_MSG, expected, actual
            );
        }
        self
    }

    /// 所有期望的片段都要出现，缺失的片段一次性报告
    #[track_caller]
    pub fn assert_string_body_contains(&self, expected: &[&str]) -> &Self {
        self.assert_body_is_not_null();
        let actual = self.string().unwrap_or_default();
        let mut asserter = SoftAsserter::new();
        for fragment in expected {
            if !actual.contains(fragment) {
                asserter.add_error(format!(
                    "{}Expected: contains '{}'\n     but: does not contain\n",
                    RESPONSE_BODY_MSG, fragment
                ));
            }
        }
        asserter.blame();
        self
    }

    #[track_caller]
    pub fn assert_string_body_contains_ignore_case(&self, expected: &[&str]) -> &Self {
        self.assert_body_is_not_null();
        let actual = self.string().unwrap_or_default().to_lowercase();
        let mut asserter = SoftAsserter::new();
        for fragment in expected {
            if !actual.contains(&fragment.to_lowercase()) {
                asserter.add_error(format!(
                    "{}Expected: contains '{}' (ignore case)\n     but: does not contain\n",
                    RESPONSE_BODY_MSG, fragment
                ));
            }
        }
        asserter.blame();
        self
    }
}

impl From<Vec<u8>> for RawBody {
    fn from(bytes: Vec<u8>) -> Self {
        RawBody::new(bytes)
    }
}

impl From<&str> for RawBody {
    fn from(text: &str) -> Self {
        RawBody::new(text.as_bytes())
    }
}

impl fmt::Display for RawBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.string() {
            Some(text) => f.write_str(&text),
            None => f.write_str("null"),
        }
    }
}
