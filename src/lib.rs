//! Desia Translator - translation between English, Odia and Desia
//!
//! English/Odia pairs go to a neural translation model, anything involving
//! Desia goes to an instruction-following language model prompted with a
//! bilingual dictionary. The crate also ships an HTTP API, a CLI and an
//! exporter for fine-tuning datasets.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod core;
pub mod processors;
pub mod server;
pub mod cli;

// Re-export key types for convenience
pub use crate::core::{
    client::{LanguageModel, OpenAiCompatibleClient},
    config::{TranslatorConfig, UnprimedPolicy},
    detector::{Detection, ScriptDetector},
    dictionary::{DictionaryEntry, DictionaryStore},
    errors::TranslationError,
    guideline::{Guideline, GuidelineCache},
    models::{LanguageCode, NeuralLocale, TranslationMethod, TranslationRequest, TranslationResult},
    router::BackendRouter,
};

pub use crate::processors::dataset::DatasetExporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
