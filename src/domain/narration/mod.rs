pub mod error;
pub mod report;
pub mod service;

pub use error::NarrationError;
pub use report::{PlanSummary, RunReport};
pub use service::{read_input, NarrationService, NarrationServiceApi};
