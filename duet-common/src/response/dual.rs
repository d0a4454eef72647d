use std::fmt;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap};

use crate::assertion::AssertionFailure;
use crate::assertion::SoftAsserter;
use crate::call::RawResponse;
use crate::converter::CallAnnotations;
use crate::response::ResponseAsserter;

/// 双结果响应
///
/// 按 HTTP 状态码只填充一个槽位：2xx 填充成功体，其余填充错误体。
/// 创建后不可变，原始响应（含未转换的消息体）一并保留。
#[derive(Debug, Clone)]
pub struct DualResponse<S, E> {
    success: Option<S>,
    error: Option<E>,
    raw: RawResponse,
    endpoint_info: String,
    annotations: CallAnnotations,
}

impl<S, E> DualResponse<S, E> {
    pub fn new(
        success: Option<S>,
        error: Option<E>,
        raw: RawResponse,
        endpoint_info: impl Into<String>,
        annotations: CallAnnotations,
    ) -> Self {
        DualResponse {
            success,
            error,
            raw,
            endpoint_info: endpoint_info.into(),
            annotations,
        }
    }

    pub fn success_body(&self) -> Option<&S> {
        self.success.as_ref()
    }

    pub fn error_body(&self) -> Option<&E> {
        self.error.as_ref()
    }

    pub fn into_bodies(self) -> (Option<S>, Option<E>) {
        (self.success, self.error)
    }

    pub fn status(&self) -> StatusCode {
        self.raw.status
    }

    pub fn status_code(&self) -> u16 {
        self.raw.status.as_u16()
    }

    pub fn status_message(&self) -> &str {
        &self.raw.message
    }

    /// 状态码是否在 [200, 299] 范围内
    pub fn is_successful(&self) -> bool {
        self.raw.is_successful()
    }

    /// 响应头
    ///
    /// 响应头缺少 Content-Type 而消息体声明了类型时，返回的副本中会补上它；
    /// 原始响应不受影响。
    pub fn headers(&self) -> HeaderMap {
        let mut headers = self.raw.headers.clone();
        if !headers.contains_key(CONTENT_TYPE) {
            let declared = self
                .raw
                .body
                .as_ref()
                .and_then(|body| body.content_type().to_header_value());
            if let Some(value) = declared {
                headers.insert(CONTENT_TYPE, value);
            }
        }
        headers
    }

    pub fn endpoint_info(&self) -> &str {
        &self.endpoint_info
    }

    pub fn call_annotations(&self) -> &CallAnnotations {
        &self.annotations
    }

    pub fn raw_response(&self) -> &RawResponse {
        &self.raw
    }
}

impl<S: fmt::Debug, E: fmt::Debug> DualResponse<S, E> {
    /// 软断言响应，结束时统一报告全部失败
    #[track_caller]
    pub fn assert_response(&self, f: impl FnOnce(&mut ResponseAsserter<'_, S, E>)) -> &Self {
        let mut asserter = ResponseAsserter::new(self);
        f(&mut asserter);
        asserter.blame();
        self
    }

    /// 断言成功响应：状态码、成功体存在，然后检查成功体
    #[track_caller]
    pub fn assert_success_response(
        &self,
        expected_status: u16,
        f: impl FnOnce(&mut SoftAsserter, &S),
    ) -> &Self {
        self.assert_response(|asserter| {
            asserter.assert_success_response(expected_status, f);
        })
    }

    /// 断言错误响应：状态码、错误体存在，然后检查错误体
    #[track_caller]
    pub fn assert_error_response(
        &self,
        expected_status: u16,
        f: impl FnOnce(&mut SoftAsserter, &E),
    ) -> &Self {
        self.assert_response(|asserter| {
            asserter.assert_error_response(expected_status, f);
        })
    }

    /// 与 `assert_response` 相同，但以值的形式返回失败而不是 panic
    pub fn check_response(
        &self,
        f: impl FnOnce(&mut ResponseAsserter<'_, S, E>),
    ) -> Result<(), AssertionFailure> {
        let mut asserter = ResponseAsserter::new(self);
        f(&mut asserter);
        asserter.finish()
    }
}

impl<S: fmt::Debug, E: fmt::Debug> fmt::Display for DualResponse<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Endpoint: {}", self.endpoint_info)?;
        writeln!(f, "Status: {} {}", self.status_code(), self.raw.message)?;
        writeln!(f, "Successful body: {:?}", self.success)?;
        write!(f, "Error body: {:?}", self.error)
    }
}
