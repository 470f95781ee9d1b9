pub mod model;
pub mod splitter;

pub use model::TextChunk;
pub use splitter::{chunk_text, normalize_whitespace, split};
