pub mod chain;
pub mod cookie;
pub mod logging;
pub mod traits;

pub use chain::InterceptorChain;
pub use self::cookie::{Cookie, CookieInterceptor, CookieStore};
pub use logging::LoggingInterceptor;
pub use traits::{DuetInterceptor, NoOpInterceptor};
