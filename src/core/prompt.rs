//! Instruction templates sent to the language-model backend

use serde::{Deserialize, Serialize};

use crate::core::dictionary::DictionaryStore;
use crate::core::models::LanguageCode;

/// System message for every translation prompt
pub const TRANSLATOR_SYSTEM_PROMPT: &str = "You are an expert translator for Desia, a low-resource language of Koraput, Odisha. \
You translate in both directions between Odia and Desia, and between English and either of them. \
Preserve proper names, numbers and punctuation. Reply with the translation only, without notes or transliteration.";

/// System message for dataset records
pub const DATASET_SYSTEM_PROMPT: &str = "You are a Desia↔Odia translator.";

const GUIDELINE_SYSTEM_PROMPT: &str = "You are a linguist preparing reference notes for an Odia↔Desia translator.";

/// A single chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Build the translation prompt; `context` is placed before the instruction when non-empty
pub fn translation_messages(
    text: &str,
    source: LanguageCode,
    target: LanguageCode,
    context: &str,
) -> Vec<ChatMessage> {
    let instruction = format!(
        "Translate the following text from {} to {}. Output only the translation.\n\n{}",
        source.display_name(),
        target.display_name(),
        text.trim()
    );

    let user = if context.trim().is_empty() {
        instruction
    } else {
        format!("{}\n\n{}", context.trim(), instruction)
    };

    vec![ChatMessage::system(TRANSLATOR_SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Build the prompt that condenses the whole dictionary into guidelines
pub fn guideline_messages(store: &DictionaryStore) -> Vec<ChatMessage> {
    let entries = store
        .entries()
        .iter()
        .map(|entry| entry.render())
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        "Below is an Odia → Desia dictionary with {} entries. Summarise it into compact translation guidelines \
that can be reused for every future translation request: recurring sound and spelling shifts, common word \
substitutions, grammatical differences, and a short list of the most frequent word pairs. Keep it under 600 words \
and write plain text.\n\n{}",
        store.len(),
        entries
    );

    vec![ChatMessage::system(GUIDELINE_SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Rough token estimate used in priming responses
pub fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}
