//! Configuration management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

use crate::core::errors::TranslationError;

/// What to do when full-dictionary context is requested before priming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnprimedPolicy {
    /// Reject the request with `NotPrimed`
    #[default]
    Fail,
    /// Use the relevant dictionary subset instead, logging a warning
    Subset,
}

impl fmt::Display for UnprimedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnprimedPolicy::Fail => write!(f, "fail"),
            UnprimedPolicy::Subset => write!(f, "subset"),
        }
    }
}

impl FromStr for UnprimedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(UnprimedPolicy::Fail),
            "subset" => Ok(UnprimedPolicy::Subset),
            other => Err(anyhow::anyhow!("unknown unprimed policy: {}", other)),
        }
    }
}

/// Configuration for the translation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Bearer key for the LLM endpoint; LLM routes fail when empty
    pub api_key: String,
    /// Base URL of an OpenAI-compatible API
    pub llm_endpoint: String,
    /// Model used when a request names none
    pub default_llm_model: String,
    /// Base URL of the neural inference server
    pub neural_endpoint: String,
    /// Model identifier reported for neural translations
    pub neural_model: String,
    /// Maximum generated length per neural request
    pub neural_max_length: usize,
    /// Beam width for neural decoding
    pub neural_num_beams: usize,
    /// Word dictionary CSV
    pub dictionary_path: PathBuf,
    /// Sentence-pair corpus; optional supplement to the word dictionary
    pub sentences_path: Option<PathBuf>,
    /// Cap on word-dictionary rows
    pub max_word_rows: usize,
    /// Cap on sentence-corpus rows
    pub max_sentence_rows: usize,
    /// Upper bound on dictionary entries injected per request
    pub context_entry_limit: usize,
    /// Deadline for every backend call, in milliseconds
    pub timeout_ms: u64,
    /// Behaviour of full-dictionary requests before priming
    pub unprimed_policy: UnprimedPolicy,
}

const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_NEURAL_ENDPOINT: &str = "http://127.0.0.1:8001";
const DEFAULT_NEURAL_MODEL: &str = "facebook/nllb-200-distilled-600M";
const DEFAULT_DICTIONARY_PATH: &str = "train/data/dict.csv";
const DEFAULT_SENTENCES_PATH: &str = "train/data/merged_texts_corrected.csv";

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            llm_endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            default_llm_model: DEFAULT_LLM_MODEL.to_string(),
            neural_endpoint: DEFAULT_NEURAL_ENDPOINT.to_string(),
            neural_model: DEFAULT_NEURAL_MODEL.to_string(),
            neural_max_length: 256,
            neural_num_beams: 5,
            dictionary_path: PathBuf::from(DEFAULT_DICTIONARY_PATH),
            sentences_path: Some(PathBuf::from(DEFAULT_SENTENCES_PATH)),
            max_word_rows: 4000,
            max_sentence_rows: 3000,
            context_entry_limit: 20,
            timeout_ms: 30000,
            unprimed_policy: UnprimedPolicy::Fail,
        }
    }
}

fn config_error(message: &str) -> TranslationError {
    TranslationError::ConfigError {
        message: message.to_string(),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

impl TranslatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let sentences_path = match std::env::var("SENTENCES_PATH") {
            Ok(path) if path.trim().is_empty() => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => defaults.sentences_path.clone(),
        };

        Ok(Self {
            api_key: env_or("OPENAI_API_KEY", ""),
            llm_endpoint: env_or("LLM_ENDPOINT", DEFAULT_LLM_ENDPOINT),
            default_llm_model: env_or("DEFAULT_LLM_MODEL", DEFAULT_LLM_MODEL),
            neural_endpoint: env_or("NEURAL_ENDPOINT", DEFAULT_NEURAL_ENDPOINT),
            neural_model: env_or("NLLB_MODEL", DEFAULT_NEURAL_MODEL),
            neural_max_length: env_parse("NEURAL_MAX_LENGTH", defaults.neural_max_length)?,
            neural_num_beams: env_parse("NEURAL_NUM_BEAMS", defaults.neural_num_beams)?,
            dictionary_path: PathBuf::from(env_or("DICTIONARY_PATH", DEFAULT_DICTIONARY_PATH)),
            sentences_path,
            max_word_rows: env_parse("MAX_WORD_ROWS", defaults.max_word_rows)?,
            max_sentence_rows: env_parse("MAX_SENTENCE_ROWS", defaults.max_sentence_rows)?,
            context_entry_limit: env_parse("CONTEXT_ENTRY_LIMIT", defaults.context_entry_limit)?,
            timeout_ms: env_parse("REQUEST_TIMEOUT_MS", defaults.timeout_ms)?,
            unprimed_policy: env_parse("UNPRIMED_POLICY", defaults.unprimed_policy)?,
        })
    }

    /// Load and validate configuration from the environment
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TranslationError> {
        if self.llm_endpoint.is_empty() {
            return Err(config_error("LLM endpoint is required"));
        }

        if self.neural_endpoint.is_empty() {
            return Err(config_error("Neural endpoint is required"));
        }

        if self.api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set; LLM routes will fail");
        }

        if self.max_word_rows == 0 || self.max_sentence_rows == 0 {
            return Err(config_error("row caps must be greater than 0"));
        }

        if self.context_entry_limit == 0 {
            return Err(config_error("context_entry_limit must be greater than 0"));
        }

        if self.timeout_ms == 0 {
            return Err(config_error("timeout_ms must be greater than 0"));
        }

        Ok(())
    }

    /// Whether the LLM backend has credentials
    pub fn llm_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }
}
