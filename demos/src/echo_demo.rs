use duet_common::{
    CookieInterceptor, DualResponse, DuetInterceptor, EchoTransport, HttpRequest, RawResponse,
    Result,
};
use duet_macro::{get, http_client, post, put};
use serde::{Deserialize, Serialize};

/// 用户数据结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
    email: String,
}

/// 认证拦截器 - 自动添加认证头部
#[derive(Default)]
struct AuthInterceptor;

impl DuetInterceptor for AuthInterceptor {
    fn before_request(&self, mut request: HttpRequest) -> anyhow::Result<HttpRequest> {
        println!("🔐 AuthInterceptor: 添加认证头部");
        request.headers.insert(
            "Authorization",
            duet_common::reqwest::header::HeaderValue::from_static("Bearer demo-token-12345"),
        );
        Ok(request)
    }

    fn after_response(&self, response: RawResponse) -> anyhow::Result<RawResponse> {
        println!("🔐 AuthInterceptor: 响应状态 {}", response.status);
        Ok(response)
    }
}

/// 回显服务客户端：请求体原样返回，状态码由 `status` 查询参数决定
#[http_client(base_url = "http://echo.local/api", interceptor = CookieInterceptor)]
struct EchoApiClient;

impl EchoApiClient {
    #[post(url = "/echo?status={status}", header = "Content-Type: text/plain", endpoint = "Echo text")]
    fn echo(&self, status: u16, body: String) -> Result<DualResponse<String, String>> {}

    #[put(url = "/users/{id}?status={status}", content_type = json, endpoint = "Update user")]
    fn update_user(&self, id: u64, status: u16, user: &User) -> Result<DualResponse<User, User>> {}

    #[get(url = "/users/{id}", interceptor = AuthInterceptor)]
    fn get_user(&self, id: u64) -> Result<DualResponse<(), ()>> {}
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let client = EchoApiClient::with_transport(EchoTransport)?;

    println!("=== 双结果响应 ===");
    let ok = client.echo(200, "hello".to_string())?;
    println!("{}\n", ok);
    ok.assert_success_response(200, |softly, body| {
        softly.softly(duet_common::assertion::matcher::is("Successful body", body.as_str(), "hello"));
    });

    let failed = client.echo(500, "boom".to_string())?;
    println!("{}\n", failed);
    failed.assert_response(|asserter| {
        asserter
            .assert_is_error_response()
            .assert_success_body_is_null()
            .assert_error_body_not_null();
    });

    println!("=== JSON 请求体 ===");
    let user = User {
        id: 42,
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    };
    let updated = client.update_user(user.id, 200, &user)?;
    println!("✅ 更新用户: {:?}", updated.success_body());
    let rejected = client.update_user(user.id, 409, &user)?;
    println!("❌ 冲突响应: {:?}", rejected.error_body());

    println!("=== 方法级拦截器 ===");
    let response = client.get_user(user.id)?;
    response.assert_response(|asserter| {
        asserter.assert_headers(|headers| {
            headers.is("Authorization", "Bearer demo-token-12345");
        });
    });
    println!("✅ 请求头已回显: {:?}", response.headers().get("Authorization"));

    Ok(())
}
