use lingua::{Language, LanguageDetector, LanguageDetectorBuilder};
use once_cell::sync::Lazy;

static DETECTOR: Lazy<LanguageDetector> = Lazy::new(|| {
    LanguageDetectorBuilder::from_languages(&[
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
    ])
    .build()
});

/// ISO 639-1 language codes we pick voices for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCode {
    English,
    Spanish,
    French,
    German,
    Italian,
    Portuguese,
}

impl LanguageCode {
    /// Get the ISO 639-1 code as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::Spanish => "es",
            LanguageCode::French => "fr",
            LanguageCode::German => "de",
            LanguageCode::Italian => "it",
            LanguageCode::Portuguese => "pt",
        }
    }

    /// Convert lingua Language to LanguageCode
    pub fn from_lingua(language: Language) -> Self {
        match language {
            Language::English => LanguageCode::English,
            Language::Spanish => LanguageCode::Spanish,
            Language::French => LanguageCode::French,
            Language::German => LanguageCode::German,
            Language::Italian => LanguageCode::Italian,
            Language::Portuguese => LanguageCode::Portuguese,
        }
    }

    /// Neural Polly voice for this language
    pub fn polly_voice(&self) -> &'static str {
        match self {
            LanguageCode::English => "Joanna",
            LanguageCode::Spanish => "Lupe",
            LanguageCode::French => "Lea",
            LanguageCode::German => "Vicki",
            LanguageCode::Italian => "Bianca",
            LanguageCode::Portuguese => "Ines",
        }
    }

    /// OpenAI voice that suits this language
    pub fn openai_voice(&self) -> &'static str {
        match self {
            LanguageCode::English => "alloy",
            LanguageCode::Spanish => "echo",
            LanguageCode::French => "nova",
            LanguageCode::German => "onyx",
            LanguageCode::Italian => "fable",
            LanguageCode::Portuguese => "shimmer",
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detect the language of a chunk, falling back to English
pub fn detect_language(text: &str) -> LanguageCode {
    match DETECTOR.detect_language_of(text) {
        Some(language) => LanguageCode::from_lingua(language),
        None => {
            tracing::warn!("Could not detect language, falling back to English");
            LanguageCode::English
        }
    }
}

/// Check if a Polly voice supports the neural engine
pub fn is_voice_neural_compatible(voice: &str) -> bool {
    // Based on AWS Polly documentation
    const NEURAL_VOICES: &[&str] = &[
        // English
        "Joanna", "Matthew", "Ivy", "Kendra", "Kimberly", "Salli", "Joey", "Justin", "Kevin",
        // Spanish
        "Lupe", "Pedro", "Sergio", // French
        "Lea", "Remi", // German
        "Vicki", "Daniel", // Italian
        "Bianca", "Adriano", // Portuguese
        "Ines", "Camila", "Vitoria", "Thiago",
    ];

    NEURAL_VOICES.contains(&voice)
}
