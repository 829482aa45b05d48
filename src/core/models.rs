//! Core data models for translation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::errors::TranslationError;

/// Human-facing language handled by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    /// English, Latin script
    English,
    /// Odia, Odia script
    Odia,
    /// Low-resource language with no neural translation support
    Desia,
}

impl LanguageCode {
    /// All orchestration-level languages
    pub const ALL: [LanguageCode; 3] = [LanguageCode::English, LanguageCode::Odia, LanguageCode::Desia];

    /// Canonical lowercase name, as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::English => "english",
            LanguageCode::Odia => "odia",
            LanguageCode::Desia => "desia",
        }
    }

    /// Name used inside LLM instructions
    pub fn display_name(&self) -> &'static str {
        match self {
            LanguageCode::English => "English",
            LanguageCode::Odia => "Odia",
            LanguageCode::Desia => "Desia",
        }
    }

    /// Locale understood by the neural backend, if any
    pub fn neural_locale(&self) -> Option<NeuralLocale> {
        match self {
            LanguageCode::English => Some(NeuralLocale::EngLatn),
            LanguageCode::Odia => Some(NeuralLocale::OryOrya),
            LanguageCode::Desia => None,
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "english" | "en" | "eng" | "eng_latn" => Ok(LanguageCode::English),
            "odia" | "oriya" | "or" | "ory" | "ory_orya" => Ok(LanguageCode::Odia),
            "desia" => Ok(LanguageCode::Desia),
            _ => Err(TranslationError::UnsupportedLanguage {
                code: s.to_string(),
                backend: "router".to_string(),
            }),
        }
    }
}

/// Locale codes of the neural (NLLB) model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuralLocale {
    /// English
    #[serde(rename = "eng_Latn")]
    EngLatn,
    /// Odia
    #[serde(rename = "ory_Orya")]
    OryOrya,
}

impl NeuralLocale {
    /// Locales the neural backend supports
    pub const SUPPORTED: [NeuralLocale; 2] = [NeuralLocale::EngLatn, NeuralLocale::OryOrya];

    /// Locale code as sent to the model
    pub fn as_str(&self) -> &'static str {
        match self {
            NeuralLocale::EngLatn => "eng_Latn",
            NeuralLocale::OryOrya => "ory_Orya",
        }
    }

    /// Orchestration-level language for this locale
    pub fn language(&self) -> LanguageCode {
        match self {
            NeuralLocale::EngLatn => LanguageCode::English,
            NeuralLocale::OryOrya => LanguageCode::Odia,
        }
    }
}

impl fmt::Display for NeuralLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NeuralLocale {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eng_Latn" => Ok(NeuralLocale::EngLatn),
            "ory_Orya" => Ok(NeuralLocale::OryOrya),
            other => Err(TranslationError::UnsupportedLanguage {
                code: other.to_string(),
                backend: "neural".to_string(),
            }),
        }
    }
}

/// Backend that produced (or should produce) a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMethod {
    /// Pretrained seq2seq translator, English <-> Odia only
    Neural,
    /// Instruction-following language model, any pair
    Llm,
}

impl fmt::Display for TranslationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationMethod::Neural => write!(f, "neural"),
            TranslationMethod::Llm => write!(f, "llm"),
        }
    }
}

/// Translation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Text to translate
    pub text: String,
    /// Source language
    pub source: LanguageCode,
    /// Target language
    pub target: LanguageCode,
    /// LLM model override; the configured default is used when absent
    pub model: Option<String>,
    /// Send dictionary context to the LLM
    pub use_context: bool,
    /// Use the primed guidelines instead of a dictionary subset
    pub use_full_dictionary: bool,
    /// Send English/Odia pairs to the LLM backend as well
    pub force_llm: bool,
}

impl TranslationRequest {
    /// Request with default context settings
    pub fn new(text: impl Into<String>, source: LanguageCode, target: LanguageCode) -> Self {
        Self {
            text: text.into(),
            source,
            target,
            model: None,
            use_context: true,
            use_full_dictionary: false,
            force_llm: false,
        }
    }

    /// Override the LLM model
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Enable or disable dictionary context
    pub fn with_context(mut self, use_context: bool) -> Self {
        self.use_context = use_context;
        self
    }

    /// Request the full-dictionary guidelines
    pub fn with_full_dictionary(mut self, use_full_dictionary: bool) -> Self {
        self.use_full_dictionary = use_full_dictionary;
        self
    }

    /// Route to the LLM even for English/Odia
    pub fn force_llm(mut self) -> Self {
        self.force_llm = true;
        self
    }
}

/// Translation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Translation output
    pub translated_text: String,
    /// Neural model or LLM that produced it
    pub model_used: String,
    /// Source language
    pub source: LanguageCode,
    /// Target language
    pub target: LanguageCode,
    /// Backend that handled the request
    pub method: TranslationMethod,
}
