use std::fmt::{Debug, Display};

use thiserror::Error;

const COLLECTED_HEADER: &str = "Collected the following errors:\n\n";

/// 软断言收集到的全部失败信息
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Collected the following errors:\n\n{}", .errors.join("\n\n"))]
pub struct AssertionFailure {
    errors: Vec<String>,
}

impl AssertionFailure {
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// 软断言器
///
/// 失败不会立即中断，而是先收集起来，最后由 [`SoftAsserter::finish`]
/// 或 [`SoftAsserter::blame`] 一次性报告。
#[derive(Debug, Default)]
pub struct SoftAsserter {
    errors: Vec<String>,
}

impl SoftAsserter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次检查结果
    pub fn softly(&mut self, check: std::result::Result<(), String>) -> &mut Self {
        if let Err(message) = check {
            self.add_error(message);
        }
        self
    }

    pub fn add_error(&mut self, message: impl Into<String>) -> &mut Self {
        let message = message.into();
        // 嵌套断言的失败信息不重复表头
        self.errors.push(message.replace(COLLECTED_HEADER, ""));
        self
    }

    pub fn add_errors(&mut self, errors: impl IntoIterator<Item = String>) -> &mut Self {
        for error in errors {
            self.add_error(error);
        }
        self
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// 结束收集，存在失败时返回 [`AssertionFailure`]
    pub fn finish(self) -> std::result::Result<(), AssertionFailure> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AssertionFailure {
                errors: self.errors,
            })
        }
    }

    /// 存在失败时立即 panic 并清空已收集的信息
    #[track_caller]
    pub fn blame(&mut self) {
        let errors = std::mem::take(&mut self.errors);
        if let Err(failure) = (SoftAsserter { errors }).finish() {
            panic!("{}", failure);
        }
    }
}

/// 在闭包内收集软断言，结束时统一报告
#[track_caller]
pub fn softly_assert(f: impl FnOnce(&mut SoftAsserter)) {
    let mut asserter = SoftAsserter::new();
    f(&mut asserter);
    asserter.blame();
}

/// 断言匹配器，失败时返回带 Expected/Actual 的说明
pub mod matcher {
    use super::*;

    pub fn is<T: PartialEq + Display + ?Sized>(reason: &str, actual: &T, expected: &T) -> Result<(), String> {
        if actual == expected {
            return Ok(());
        }
        Err(format!(
            "{}\nExpected: is  {}\n  Actual: was {}",
            reason, expected, actual
        ))
    }

    pub fn in_range(reason: &str, actual: u16, min: u16, max: u16) -> Result<(), String> {
        if (min..=max).contains(&actual) {
            return Ok(());
        }
        Err(format!(
            "{}\nExpected: in range {}...{}\n  Actual: was {}",
            reason, min, max, actual
        ))
    }

    pub fn is_not_null<T>(reason: &str, actual: Option<&T>) -> Result<(), String> {
        match actual {
            Some(_) => Ok(()),
            None => Err(format!("{}\nExpected: is not null\n  Actual: null", reason)),
        }
    }

    pub fn is_null<T: Debug>(reason: &str, actual: Option<&T>) -> Result<(), String> {
        match actual {
            None => Ok(()),
            Some(value) => Err(format!(
                "{}\nExpected: is null\n  Actual: {:?}",
                reason, value
            )),
        }
    }

    pub fn contains(reason: &str, actual: &str, expected: &str) -> Result<(), String> {
        if actual.contains(expected) {
            return Ok(());
        }
        Err(format!(
            "{}\nExpected: contains '{}'\n  Actual: was '{}'",
            reason, expected, actual
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_without_errors() {
        let asserter = SoftAsserter::new();
        assert!(asserter.finish().is_ok());
    }

    #[test]
    fn test_errors_are_collected() {
        let mut asserter = SoftAsserter::new();
        asserter
            .softly(matcher::is("HTTP status code", &200, &201))
            .softly(matcher::in_range("Successful HTTP status code", 500, 200, 299));

        let failure = asserter.finish().unwrap_err();
        assert_eq!(failure.errors().len(), 2);
        assert_eq!(
            failure.to_string(),
            "Collected the following errors:\n\n\
             HTTP status code\nExpected: is  201\n  Actual: was 200\n\n\
             Successful HTTP status code\nExpected: in range 200...299\n  Actual: was 500"
        );
    }

    #[test]
    fn test_nested_header_is_removed() {
        let mut inner = SoftAsserter::new();
        inner.add_error("inner failure");
        let inner_failure = inner.finish().unwrap_err();

        let mut outer = SoftAsserter::new();
        outer.add_error(inner_failure.to_string());
        assert_eq!(outer.errors(), ["inner failure".to_string()]);
    }

    #[test]
    #[should_panic(expected = "Expected: is not null")]
    fn test_softly_assert_panics() {
        softly_assert(|asserter| {
            asserter.softly(matcher::is_not_null::<String>("Successful body", None));
        });
    }

    #[test]
    fn test_null_matchers() {
        assert!(matcher::is_null::<i32>("body", None).is_ok());
        assert_eq!(
            matcher::is_null("body", Some(&5)).unwrap_err(),
            "body\nExpected: is null\n  Actual: 5"
        );
    }
}
