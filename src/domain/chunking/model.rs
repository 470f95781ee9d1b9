use serde::Serialize;

/// One bounded slice of the source text, numbered from 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
}

impl TextChunk {
    pub fn new(index: usize, text: String) -> Self {
        Self { index, text }
    }
}
