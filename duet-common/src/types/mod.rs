pub mod args;
pub mod http;
pub mod proxy;

pub use args::{HandlerArgs, HttpClientArgs};
pub use http::{ContentTypeArg, HttpMethod};
pub use proxy::ProxyArg;
