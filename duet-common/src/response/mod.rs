pub mod asserter;
pub mod dual;

pub use asserter::{HeadersAsserter, ResponseAsserter};
pub use dual::DualResponse;
