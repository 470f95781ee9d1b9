pub mod error;
pub mod service;

pub use error::MergeError;
pub use service::Merger;
