use isolang::Language as IsoLanguage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Language utilities for the supported translation pair
///
/// The pipeline translates between exactly two languages. Codes are accepted
/// in ISO 639-1 or ISO 639-3 form (or by English name) and normalized through
/// isolang before being matched against the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "pa")]
    Punjabi,
}

impl Language {
    /// Both members of the pair, in display order
    pub const ALL: [Language; 2] = [Language::English, Language::Punjabi];

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Punjabi => "pa",
        }
    }

    /// English name of the language
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Punjabi => "Punjabi",
        }
    }

    /// Name of the language in its own script
    pub fn native_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Punjabi => "ਪੰਜਾਬੀ",
        }
    }

    /// Writing script used for this language
    pub fn script(&self) -> Script {
        match self {
            Self::English => Script::Latin,
            Self::Punjabi => Script::Gurmukhi,
        }
    }

    /// The other member of the pair
    pub fn other(&self) -> Language {
        match self {
            Self::English => Self::Punjabi,
            Self::Punjabi => Self::English,
        }
    }

    /// Human readable label for a translation direction, e.g. "English → Punjabi"
    pub fn pair_label(source: Language, target: Language) -> String {
        format!("{} → {}", source.name(), target.name())
    }

    /// Parse a language code or name into a member of the pair
    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        let normalized = code.trim().to_lowercase();
        let iso = match normalized.as_str() {
            "english" => IsoLanguage::from_639_3("eng"),
            "punjabi" | "panjabi" | "gurmukhi" => IsoLanguage::from_639_3("pan"),
            code if code.len() == 2 => IsoLanguage::from_639_1(code),
            code if code.len() == 3 => IsoLanguage::from_639_3(code),
            _ => None,
        };

        match iso.map(|lang| lang.to_639_3()) {
            Some("eng") => Ok(Self::English),
            Some("pan") => Ok(Self::Punjabi),
            _ => Err(ValidationError::UnsupportedLanguage(code.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

/// Writing systems relevant to the pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Gurmukhi,
}

impl Script {
    /// Classify a single character, `None` for digits, punctuation and other scripts
    pub fn of(ch: char) -> Option<Script> {
        match ch {
            '\u{0A00}'..='\u{0A7F}' => Some(Script::Gurmukhi),
            'A'..='Z' | 'a'..='z' => Some(Script::Latin),
            '\u{00C0}'..='\u{024F}' if ch.is_alphabetic() => Some(Script::Latin),
            _ => None,
        }
    }
}

/// Count letters per script in a text
pub fn script_counts(text: &str) -> (usize, usize) {
    text.chars().fold((0, 0), |(latin, gurmukhi), ch| match Script::of(ch) {
        Some(Script::Latin) => (latin + 1, gurmukhi),
        Some(Script::Gurmukhi) => (latin, gurmukhi + 1),
        None => (latin, gurmukhi),
    })
}

/// Script with the most letters in a text, `None` if it has no letters of either
pub fn dominant_script(text: &str) -> Option<Script> {
    match script_counts(text) {
        (0, 0) => None,
        (latin, gurmukhi) if gurmukhi > latin => Some(Script::Gurmukhi),
        _ => Some(Script::Latin),
    }
}

/// Source language detection
///
/// Detection is advisory: callers fall back to a fixed language when a
/// detector has no answer.
pub trait LanguageDetector: Send + Sync {
    /// Guess the language of a text sample
    fn detect(&self, sample: &str) -> Option<Language>;
}

/// Detector that classifies by the share of Gurmukhi letters
#[derive(Debug, Clone)]
pub struct ScriptDetector {
    /// Minimum share of Gurmukhi letters for a Punjabi verdict
    pub gurmukhi_threshold: f32,

    /// Minimum letters needed before answering at all
    pub min_letters: usize,
}

impl Default for ScriptDetector {
    fn default() -> Self {
        Self {
            gurmukhi_threshold: 0.3,
            min_letters: 3,
        }
    }
}

impl LanguageDetector for ScriptDetector {
    fn detect(&self, sample: &str) -> Option<Language> {
        let (latin, gurmukhi) = script_counts(sample);
        let total = latin + gurmukhi;
        if total < self.min_letters {
            return None;
        }

        if gurmukhi as f32 / total as f32 >= self.gurmukhi_threshold {
            Some(Language::Punjabi)
        } else {
            Some(Language::English)
        }
    }
}

/// Maximum number of characters handed to a detector
pub const DETECTION_SAMPLE_CHARS: usize = 1000;

/// Detect the source language of a text, falling back when detection fails
pub fn detect_source_language(detector: &dyn LanguageDetector, text: &str, fallback: Language) -> Language {
    let sample: String = text.chars().take(DETECTION_SAMPLE_CHARS).collect();
    detector.detect(&sample).unwrap_or(fallback)
}
