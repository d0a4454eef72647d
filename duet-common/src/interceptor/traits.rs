use crate::call::{HttpRequest, RawResponse};

/// Duet HTTP 拦截器接口
///
/// 请求钩子在发送前按注册顺序执行，可以修改请求；响应钩子在成功收到响应后
/// 按注册顺序执行，可以修改响应。任一环节失败时，链上每个拦截器的
/// `on_error` 都会被调用一次，随后原始错误继续向上传播。
pub trait DuetInterceptor: Send + Sync {
    /// 请求前处理
    fn before_request(&self, request: HttpRequest) -> anyhow::Result<HttpRequest>;

    /// 响应后处理
    fn after_response(&self, response: RawResponse) -> anyhow::Result<RawResponse>;

    /// 调用失败时的通知，只能观察错误，不能吞掉它
    fn on_error(&self, _endpoint: &str, _error: &anyhow::Error) {}
}

/// 空拦截器实现，用于测试和默认情况
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpInterceptor;

impl DuetInterceptor for NoOpInterceptor {
    fn before_request(&self, request: HttpRequest) -> anyhow::Result<HttpRequest> {
        Ok(request)
    }

    fn after_response(&self, response: RawResponse) -> anyhow::Result<RawResponse> {
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Body;
    use crate::header::ContentType;
    use reqwest::{Method, StatusCode, Url};

    #[test]
    fn test_no_op_interceptor() {
        let url = Url::parse("http://localhost/users").unwrap();
        let mut request = HttpRequest::new(Method::POST, url.clone());
        request.body = Some(Body::new(ContentType::TEXT_PLAIN, vec![1, 2, 3]));

        let request = NoOpInterceptor.before_request(request).unwrap();
        assert_eq!(request.body.unwrap().bytes(), [1, 2, 3]);

        let response = NoOpInterceptor
            .after_response(RawResponse::new(url, StatusCode::OK))
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }
}
