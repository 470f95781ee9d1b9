use super::model::TextChunk;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

// Applied to whitespace-normalized text, so a single space always follows the terminator.
static SENTENCE_END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?] ").expect("valid regex"));

/// Collapse every run of whitespace into a single space and trim both ends
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Split normalized text into sentences.
///
/// A boundary sits after `.`, `!` or `?` followed by whitespace; the terminator stays
/// with the sentence it ends.
pub fn sentences(normalized: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for mat in SENTENCE_END_RE.find_iter(normalized) {
        // Terminators are ASCII, so one byte past the match start is a char boundary
        sentences.push(&normalized[start..mat.start() + 1]);
        start = mat.end();
    }

    if start < normalized.len() {
        sentences.push(&normalized[start..]);
    }

    sentences
}

/// Split text into ordered chunks of at most `max_length` characters, preferring
/// sentence boundaries.
///
/// Sentences are packed greedily. A sentence longer than `max_length` is word-packed on
/// its own, and a single word longer than `max_length` is cut at fixed offsets. Only
/// those cut pieces may reach `max_length` exactly without a word boundary; nothing
/// exceeds it.
pub fn split(text: &str, max_length: usize) -> Vec<String> {
    let max_length = max_length.max(1);
    let normalized = normalize_whitespace(text);

    let mut chunks = Vec::new();
    let mut buffer = Buffer::default();

    for sentence in sentences(&normalized) {
        if char_len(sentence) > max_length {
            // Keep output order: whatever is buffered precedes this sentence
            buffer.flush_into(&mut chunks);
            chunks.extend(split_sentence(sentence, max_length));
            continue;
        }

        if !buffer.fits(sentence, max_length) {
            buffer.flush_into(&mut chunks);
        }
        buffer.push(sentence);
    }

    buffer.flush_into(&mut chunks);
    chunks
}

/// Same as [`split`], numbering the chunks from 1
pub fn chunk_text(text: &str, max_length: usize) -> Vec<TextChunk> {
    split(text, max_length)
        .into_iter()
        .enumerate()
        .map(|(position, text)| TextChunk::new(position + 1, text))
        .collect()
}

fn split_sentence(sentence: &str, max_length: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut buffer = Buffer::default();

    for word in sentence.split_whitespace() {
        if buffer.fits(word, max_length) {
            buffer.push(word);
            continue;
        }

        buffer.flush_into(&mut pieces);

        if char_len(word) > max_length {
            pieces.extend(hard_split(word, max_length));
        } else {
            buffer.push(word);
        }
    }

    buffer.flush_into(&mut pieces);
    pieces
}

fn hard_split(word: &str, max_length: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_length)
        .map(|piece| piece.iter().collect())
        .collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Space-joined accumulator that tracks its length in characters
#[derive(Default)]
struct Buffer {
    text: String,
    len: usize,
}

impl Buffer {
    fn fits(&self, part: &str, max_length: usize) -> bool {
        let separator = if self.text.is_empty() { 0 } else { 1 };
        self.len + separator + char_len(part) <= max_length
    }

    fn push(&mut self, part: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
            self.len += 1;
        }
        self.text.push_str(part);
        self.len += char_len(part);
    }

    fn flush_into(&mut self, out: &mut Vec<String>) {
        if !self.text.is_empty() {
            out.push(std::mem::take(&mut self.text));
        }
        self.len = 0;
    }
}
