pub mod adapter;
pub mod client;
pub mod echo;
pub mod reqwest_transport;
pub mod transport;

pub use adapter::{CallOutcome, CallState, DualResponseCallAdapter};
pub use client::{DuetClient, DuetClientBuilder, DuetRequestBuilder};
pub use echo::EchoTransport;
pub use reqwest_transport::{ProxySettings, ProxyType, ReqwestTransport, TransportConfig};
pub use transport::{HttpRequest, RawResponse, Transport, is_bodiless};
