use duet_common::{CookieInterceptor, DualResponse, EchoTransport, LoggingInterceptor, Result};
use duet_macro::{get, http_client};

#[http_client(base_url = "http://localhost:8080", proxy = false)]
struct DirectClient;

#[http_client(
    base_url = "http://localhost:8080",
    interceptor = LoggingInterceptor,
    proxy(type = socks5, url = "127.0.0.1:1080", username = "user", password = "secret")
)]
struct SocksClient;

#[http_client(base_url = "http://localhost:8080/", interceptor = CookieInterceptor)]
struct CookieClient;

impl CookieClient {
    #[get(url = "echo")]
    pub fn ping(&self) -> Result<DualResponse<String, String>> {}
}

#[test]
fn test_clients_build_with_transport_config() {
    let direct = DirectClient::try_new().unwrap();
    assert_eq!(direct.client().base_url(), "http://localhost:8080");

    let socks = SocksClient::try_new().unwrap();
    assert_eq!(socks.client().interceptors().len(), 1);
}

#[test]
fn test_client_level_interceptor_and_base_url() {
    let client = CookieClient::with_transport(EchoTransport).unwrap();
    assert_eq!(client.client().interceptors().len(), 1);

    let response = client.ping().unwrap();
    assert_eq!(
        response.raw_response().url.as_str(),
        "http://localhost:8080/echo"
    );
    assert_eq!(response.success_body(), None);
}

#[test]
fn test_with_client() {
    let shared = duet_common::DuetClient::builder("http://localhost:9090")
        .transport(EchoTransport)
        .build()
        .unwrap();
    let client = CookieClient::with_client(shared.clone());
    assert_eq!(client.client().base_url(), "http://localhost:9090");
    assert_eq!(client.client().interceptors().len(), 0);
}
