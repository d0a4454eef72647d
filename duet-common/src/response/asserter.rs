use std::fmt::Debug;

use reqwest::header::{CONTENT_TYPE, HeaderMap};

use crate::assertion::{AssertionFailure, SoftAsserter, matcher};
use crate::response::DualResponse;

/// 响应的软断言器
///
/// 所有检查先收集失败信息，由 [`ResponseAsserter::blame`] 或
/// [`ResponseAsserter::finish`] 统一报告。
pub struct ResponseAsserter<'a, S, E> {
    response: &'a DualResponse<S, E>,
    soft: SoftAsserter,
}

impl<'a, S: Debug, E: Debug> ResponseAsserter<'a, S, E> {
    pub fn new(response: &'a DualResponse<S, E>) -> Self {
        ResponseAsserter {
            response,
            soft: SoftAsserter::new(),
        }
    }

    pub fn response(&self) -> &'a DualResponse<S, E> {
        self.response
    }

    pub fn assert_http_status_code_is(&mut self, expected: u16) -> &mut Self {
        let actual = self.response.status_code();
        self.soft.softly(matcher::is("HTTP status code", &actual, &expected));
        self
    }

    /// 状态信息比较时忽略大小写
    pub fn assert_http_status_message_is(&mut self, expected: &str) -> &mut Self {
        let actual = self.response.status_message();
        if !actual.eq_ignore_ascii_case(expected) {
            self.soft.softly(matcher::is("HTTP status message", actual, expected));
        }
        self
    }

    pub fn assert_is_successful_response(&mut self) -> &mut Self {
        let actual = self.response.status_code();
        self.soft
            .softly(matcher::in_range("Successful HTTP status code", actual, 200, 299));
        self
    }

    pub fn assert_is_error_response(&mut self) -> &mut Self {
        let actual = self.response.status_code();
        self.soft
            .softly(matcher::in_range("Error HTTP status code", actual, 300, 599));
        self
    }

    pub fn assert_success_body_not_null(&mut self) -> &mut Self {
        self.soft
            .softly(matcher::is_not_null("Successful body", self.response.success_body()));
        self
    }

    pub fn assert_success_body_is_null(&mut self) -> &mut Self {
        self.soft
            .softly(matcher::is_null("Successful body", self.response.success_body()));
        self
    }

    pub fn assert_error_body_not_null(&mut self) -> &mut Self {
        self.soft
            .softly(matcher::is_not_null("Error body", self.response.error_body()));
        self
    }

    pub fn assert_error_body_is_null(&mut self) -> &mut Self {
        self.soft
            .softly(matcher::is_null("Error body", self.response.error_body()));
        self
    }

    /// 检查成功体
    ///
    /// 响应不是成功响应或成功体为空时立即报告已收集的失败。
    #[track_caller]
    pub fn assert_success_body(&mut self, f: impl FnOnce(&mut SoftAsserter, &S)) -> &mut Self {
        self.assert_is_successful_response()
            .assert_success_body_not_null()
            .blame();
        if let Some(body) = self.response.success_body() {
            f(&mut self.soft, body);
        }
        self
    }

    /// 检查错误体
    ///
    /// 响应不是错误响应或错误体为空时立即报告已收集的失败。
    #[track_caller]
    pub fn assert_error_body(&mut self, f: impl FnOnce(&mut SoftAsserter, &E)) -> &mut Self {
        self.assert_is_error_response()
            .assert_error_body_not_null()
            .blame();
        if let Some(body) = self.response.error_body() {
            f(&mut self.soft, body);
        }
        self
    }

    #[track_caller]
    pub fn assert_success_response(
        &mut self,
        expected_status: u16,
        f: impl FnOnce(&mut SoftAsserter, &S),
    ) -> &mut Self {
        self.assert_success_body(f)
            .assert_http_status_code_is(expected_status)
    }

    #[track_caller]
    pub fn assert_error_response(
        &mut self,
        expected_status: u16,
        f: impl FnOnce(&mut SoftAsserter, &E),
    ) -> &mut Self {
        self.assert_error_body(f)
            .assert_http_status_code_is(expected_status)
    }

    /// 检查响应头
    pub fn assert_headers(&mut self, f: impl FnOnce(&mut HeadersAsserter)) -> &mut Self {
        let mut headers = HeadersAsserter::new(self.response.headers());
        f(&mut headers);
        self.soft.add_errors(headers.into_errors());
        self
    }

    pub fn errors(&self) -> &[String] {
        self.soft.errors()
    }

    pub fn finish(self) -> Result<(), AssertionFailure> {
        self.soft.finish()
    }

    /// 存在失败时立即 panic
    #[track_caller]
    pub fn blame(&mut self) -> &mut Self {
        self.soft.blame();
        self
    }
}

/// 响应头的软断言器
#[derive(Debug)]
pub struct HeadersAsserter {
    headers: HeaderMap,
    soft: SoftAsserter,
}

impl HeadersAsserter {
    pub fn new(headers: HeaderMap) -> Self {
        HeadersAsserter {
            headers,
            soft: SoftAsserter::new(),
        }
    }

    fn value(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
    }

    fn add(&mut self, name: &str, condition: &str, expected: Option<&str>, actual: Option<&str>) {
        let expected = match expected {
            Some(expected) => format!("{} {}", condition, expected),
            None => condition.to_string(),
        };
        self.soft.add_error(format!(
            "Response header '{}'\nExpected: {}\n  Actual: {}",
            name,
            expected,
            actual.unwrap_or("null")
        ));
    }

    pub fn is_present(&mut self, name: &str) -> &mut Self {
        if self.value(name).is_none() {
            self.add(name, "is present", None, None);
        }
        self
    }

    pub fn not_present(&mut self, name: &str) -> &mut Self {
        if let Some(actual) = self.value(name) {
            self.add(name, "not present", None, Some(&actual));
        }
        self
    }

    /// 忽略大小写比较
    pub fn is(&mut self, name: &str, expected: &str) -> &mut Self {
        let actual = self.value(name);
        if !actual.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(expected)) {
            self.add(name, "is", Some(expected), actual.as_deref());
        }
        self
    }

    /// 忽略大小写检查包含关系
    pub fn contains(&mut self, name: &str, expected: &str) -> &mut Self {
        let actual = self.value(name);
        let found = actual
            .as_deref()
            .is_some_and(|a| a.trim().to_lowercase().contains(&expected.to_lowercase()));
        if !found {
            self.add(name, "contains", Some(expected), actual.as_deref());
        }
        self
    }

    pub fn content_type_is_present(&mut self) -> &mut Self {
        self.is_present(CONTENT_TYPE.as_str())
    }

    pub fn content_type_is(&mut self, expected: &str) -> &mut Self {
        self.is(CONTENT_TYPE.as_str(), expected)
    }

    pub fn content_type_contains(&mut self, expected: &str) -> &mut Self {
        self.contains(CONTENT_TYPE.as_str(), expected)
    }

    pub fn errors(&self) -> &[String] {
        self.soft.errors()
    }

    pub fn into_errors(self) -> Vec<String> {
        self.soft.errors().to_vec()
    }
}
