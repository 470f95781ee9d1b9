pub mod error;
pub mod events;
pub mod processor;
pub mod supervisor;

pub use error::SupervisorError;
pub use events::{EventSink, FanoutSink, RunEvent, TracingEventSink};
pub use processor::{ChunkOutcome, ChunkProcessor, FailedChunk, ProcessorSettings};
pub use supervisor::{SessionHandle, SessionState, SessionSupervisor};
