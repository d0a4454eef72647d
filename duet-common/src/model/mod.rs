pub mod raw_body;
pub mod resource_file;

pub use raw_body::RawBody;
pub use resource_file::ResourceFile;
