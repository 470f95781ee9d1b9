pub mod language;

pub use language::{detect_language, is_voice_neural_compatible, LanguageCode};
