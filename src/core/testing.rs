//! In-process backends and fixtures for unit tests

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::client::LanguageModel;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{NeuralLocale, TranslationMethod};
use crate::core::neural::{NeuralLoader, NeuralTranslator};
use crate::core::prompt::ChatMessage;

/// Language model that echoes a deterministic reply and records prompts
#[derive(Default)]
pub struct FakeLanguageModel {
    calls: AtomicUsize,
    prompts: Mutex<Vec<(Vec<ChatMessage>, String)>>,
    delay: Option<Duration>,
    fail_with: Option<String>,
}

impl FakeLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Last user message and model seen
    pub fn last_prompt(&self) -> Option<(String, String)> {
        let prompts = self.prompts.lock().unwrap();
        prompts.last().map(|(messages, model)| {
            let user = messages
                .iter()
                .rev()
                .find(|m| m.role == "user")
                .map(|m| m.content.clone())
                .unwrap_or_default();
            (user, model.clone())
        })
    }

    /// Reply the fake gives for a prompt
    pub fn reply_for(messages: &[ChatMessage], model: &str) -> String {
        let user_chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
        format!("[{}] reply to {} chars", model, user_chars)
    }
}

#[async_trait]
impl LanguageModel for FakeLanguageModel {
    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push((messages.to_vec(), model.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.fail_with {
            Some(message) => Err(TranslationError::backend(TranslationMethod::Llm, message.clone())),
            None => Ok(Self::reply_for(messages, model)),
        }
    }
}

/// Neural translator that tags its input with the direction
#[derive(Default)]
pub struct FakeNeuralTranslator {
    calls: AtomicUsize,
}

impl FakeNeuralTranslator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NeuralTranslator for FakeNeuralTranslator {
    async fn translate(&self, text: &str, source: NeuralLocale, target: NeuralLocale) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}>{}: {}", source, target, text))
    }
}

/// Loader counting how often the model is built
pub struct FakeNeuralLoader {
    model: Arc<FakeNeuralTranslator>,
    loads: AtomicUsize,
    failures_left: AtomicUsize,
}

impl FakeNeuralLoader {
    pub fn new(model: FakeNeuralTranslator) -> Self {
        Self {
            model: Arc::new(model),
            loads: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
        }
    }

    pub fn failing_first(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn translations(&self) -> usize {
        self.model.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NeuralLoader for FakeNeuralLoader {
    async fn load(&self) -> Result<Arc<dyn NeuralTranslator>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(TranslationError::backend(TranslationMethod::Neural, "model unavailable"));
        }

        let model: Arc<dyn NeuralTranslator> = self.model.clone();
        Ok(model)
    }
}

/// Sample dictionary in the on-disk column layout
pub const SAMPLE_DICTIONARY: &str = "odia_word,desia_word\n\
ଅକଲ୍‌,ବୁଦ୍ଧି\n\
ଅଖ,ଆଖି\n\
ଅନେକ,ବେସି\n\
ପିଲା,ଛୁଆ\n";

/// Write a CSV fixture into `dir`
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}
