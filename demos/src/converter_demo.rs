use std::any::Any;
use std::sync::Arc;

use duet_common::converter::{DecodeContext, EncodeContext, boxed, text_value};
use duet_common::reqwest::Method;
use duet_common::{
    Body, BodyType, CallAnnotations, ContentType, Converter, ConverterAnnotation, ConverterClass,
    ConverterRegistry, DualResponse, DuetClient, DuetError, EchoTransport, ParameterAnnotations,
    RawBody, RequestValue, Result,
};

/// 反转文本的转换器
#[derive(Default)]
struct ReverseConverter;

impl Converter for ReverseConverter {
    fn encode(&self, value: &dyn RequestValue, ctx: &EncodeContext<'_>) -> Result<Option<Body>> {
        Ok(text_value(value).map(|text| {
            Body::new(
                ctx.content_type_or(ContentType::TEXT_PLAIN),
                text.chars().rev().collect::<String>(),
            )
        }))
    }

    fn decode(
        &self,
        body: Option<&Body>,
        _ctx: &DecodeContext<'_>,
    ) -> Result<Option<Box<dyn Any + Send>>> {
        Ok(body.and_then(|body| boxed(body.text().chars().rev().collect::<String>())))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut registry = ConverterRegistry::with_defaults();
    registry.register_mime_converter(Arc::new(ReverseConverter), &[ContentType::TEXT_HTML]);
    println!("{}\n", registry);

    let client = DuetClient::builder("http://echo.local")
        .transport(EchoTransport)
        .registry(registry)
        .build()?;

    println!("=== 原始类型表：字节数组 ===");
    let annotations = CallAnnotations::new();
    let bytes: Vec<u8> = vec![0xCA, 0xFE, 0xBA, 0xBE];
    let response: DualResponse<Vec<u8>, ()> = client
        .request(Method::POST, "/bytes", &annotations)
        .body(&bytes, &ParameterAnnotations::EMPTY)
        .execute()?;
    println!("✅ 往返字节: {:02X?}", response.success_body());

    println!("=== 原始响应体 ===");
    let response: DualResponse<RawBody, RawBody> = client
        .request(Method::GET, "/echo?status=204", &annotations)
        .execute()?;
    println!("✅ 204 响应体: {:?}", response.success_body());

    println!("=== 注解声明的转换器 ===");
    let annotations = CallAnnotations::new()
        .with_content_type(ContentType::TEXT_PLAIN)
        .with_request_converter(ConverterAnnotation::for_types(
            ConverterClass::of::<ReverseConverter>(),
            [BodyType::of::<String>()],
        ));
    let response: DualResponse<String, ()> = client
        .request(Method::POST, "/echo", &annotations)
        .body(&"stressed".to_string(), &ParameterAnnotations::EMPTY)
        .execute()?;
    println!("✅ 反转后发送: {:?}", response.success_body());

    println!("=== 未注册的类型 ===");
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Unknown {
        value: u8,
    }
    let annotations = CallAnnotations::new().with_content_type(ContentType::APP_XML);
    let result = client
        .request(Method::POST, "/echo", &annotations)
        .body(&Unknown { value: 1 }, &ParameterAnnotations::EMPTY)
        .execute::<Unknown, ()>();
    match result {
        Err(error @ DuetError::ConverterNotFound { .. }) => println!("❌ {}", error),
        Err(error) => return Err(error.into()),
        Ok(_) => println!("⚠️ 意外地找到了转换器"),
    }

    Ok(())
}
