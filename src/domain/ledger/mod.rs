pub mod error;
pub mod model;
pub mod service;
pub mod template;

pub use error::LedgerError;
pub use model::{ChunkJob, ChunkStatus, DownloadResult, LedgerPlan};
pub use service::JobLedger;
pub use template::NameTemplate;
