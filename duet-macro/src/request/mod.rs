pub mod builder;
pub mod dynamic_params;

pub use builder::{BodyParam, RequestBuilder};
pub use dynamic_params::DynamicParamsProcessor;
