//! Cached dictionary guidelines and the priming protocol
//!
//! A guideline is produced by asking the language model to condense the whole
//! dictionary, then reused by every full-dictionary request. Priming replaces
//! the cached value wholesale. A guideline primed with one model is served to
//! requests naming another model; re-prime explicitly when that matters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::core::client::{with_timeout, LanguageModel};
use crate::core::dictionary::DictionarySource;
use crate::core::errors::Result;
use crate::core::models::TranslationMethod;
use crate::core::prompt;

/// A primed guideline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guideline {
    /// Condensed guideline text
    pub text: String,
    /// Model that produced the text
    pub model: String,
    /// When priming finished
    pub primed_at: DateTime<Utc>,
}

/// Process-wide guideline cache
#[derive(Debug, Default)]
pub struct GuidelineCache {
    current: RwLock<Option<Arc<Guideline>>>,
    priming: Mutex<()>,
    generation: AtomicU64,
}

impl GuidelineCache {
    /// Create an empty, unprimed cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Current guideline, if primed
    pub async fn get(&self) -> Option<Arc<Guideline>> {
        self.current.read().await.clone()
    }

    /// Whether a guideline is cached
    pub async fn is_primed(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Number of successful primings so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Summarise the dictionary with `model` and cache the result
    ///
    /// Priming is single flight: a caller that queued behind a priming for
    /// the same model which then succeeded gets that result instead of a
    /// second backend call. On any failure the previous guideline stays.
    pub async fn prime(
        &self,
        model: &str,
        dictionary: &DictionarySource,
        llm: &dyn LanguageModel,
        timeout: Duration,
    ) -> Result<Arc<Guideline>> {
        let observed = self.generation();
        let _guard = self.priming.lock().await;

        if self.generation() != observed {
            if let Some(existing) = self.get().await {
                if existing.model == model {
                    debug!("Priming for {} completed while waiting, reusing it", model);
                    return Ok(existing);
                }
            }
        }

        let store = dictionary.reload().await.map_err(|e| {
            warn!("Priming aborted, dictionary unavailable: {}", e);
            e
        })?;

        let messages = prompt::guideline_messages(&store);
        let text = with_timeout(TranslationMethod::Llm, timeout, llm.complete(&messages, model)).await?;

        let guideline = Arc::new(Guideline {
            text: text.trim().to_string(),
            model: model.to_string(),
            primed_at: Utc::now(),
        });

        *self.current.write().await = Some(Arc::clone(&guideline));
        self.generation.fetch_add(1, Ordering::AcqRel);

        info!(
            "Primed guidelines with {} from {} entries (~{} tokens)",
            model,
            store.len(),
            prompt::estimate_tokens(&guideline.text)
        );
        Ok(guideline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dictionary::DictionaryLimits;
    use crate::core::errors::TranslationError;
    use crate::core::testing::{write_file, FakeLanguageModel, SAMPLE_DICTIONARY};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn sample_source(dir: &std::path::Path) -> DictionarySource {
        let words = write_file(dir, "dict.csv", SAMPLE_DICTIONARY);
        DictionarySource::new(words, None, DictionaryLimits::default())
    }

    #[tokio::test]
    async fn test_get_before_and_after_priming() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_source(dir.path());
        let llm = FakeLanguageModel::new();
        let cache = GuidelineCache::new();

        assert!(cache.get().await.is_none());
        assert!(!cache.is_primed().await);

        let primed = cache.prime("m1", &source, &llm, TIMEOUT).await.unwrap();
        let cached = cache.get().await.unwrap();
        assert_eq!(cached.model, "m1");
        assert_eq!(cached.text, primed.text);
        assert!(cache.is_primed().await);

        let (prompt, model) = llm.last_prompt().unwrap();
        assert_eq!(model, "m1");
        assert!(prompt.contains("ଅଖ → ଆଖି"));
    }

    #[tokio::test]
    async fn test_priming_is_deterministic_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_source(dir.path());
        let llm = FakeLanguageModel::new();
        let cache = GuidelineCache::new();

        let first = cache.prime("m1", &source, &llm, TIMEOUT).await.unwrap();
        let second = cache.prime("m1", &source, &llm, TIMEOUT).await.unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(llm.calls(), 2);
        assert_eq!(cache.generation(), 2);

        let third = cache.prime("m2", &source, &llm, TIMEOUT).await.unwrap();
        assert_eq!(third.model, "m2");
        assert_eq!(cache.get().await.unwrap().model, "m2");
    }

    #[tokio::test]
    async fn test_missing_dictionary_leaves_cache_unprimed() {
        let dir = tempfile::tempdir().unwrap();
        let source = DictionarySource::new(dir.path().join("dict.csv"), None, DictionaryLimits::default());
        let llm = FakeLanguageModel::new();
        let cache = GuidelineCache::new();

        let result = cache.prime("m1", &source, &llm, TIMEOUT).await;
        assert!(matches!(result, Err(TranslationError::MissingResource { .. })));
        assert!(!cache.is_primed().await);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_priming_keeps_previous_guideline() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_source(dir.path());
        let cache = GuidelineCache::new();

        let good = FakeLanguageModel::new();
        let previous = cache.prime("m1", &source, &good, TIMEOUT).await.unwrap();

        let broken = FakeLanguageModel::new().failing("quota exceeded");
        let result = cache.prime("m2", &source, &broken, TIMEOUT).await;
        assert!(matches!(result, Err(TranslationError::BackendFailure { .. })));

        let cached = cache.get().await.unwrap();
        assert_eq!(cached.model, "m1");
        assert_eq!(cached.text, previous.text);
    }

    #[tokio::test]
    async fn test_priming_timeout_keeps_cache_unprimed() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_source(dir.path());
        let slow = FakeLanguageModel::new().with_delay(Duration::from_secs(5));
        let cache = GuidelineCache::new();

        let result = cache.prime("m1", &source, &slow, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(TranslationError::BackendFailure { .. })));
        assert!(!cache.is_primed().await);
    }

    #[tokio::test]
    async fn test_concurrent_priming_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_source(dir.path());
        let llm = FakeLanguageModel::new().with_delay(Duration::from_millis(50));
        let cache = GuidelineCache::new();

        let (a, b) = tokio::join!(
            cache.prime("m1", &source, &llm, TIMEOUT),
            cache.prime("m1", &source, &llm, TIMEOUT),
        );

        assert_eq!(a.unwrap().text, b.unwrap().text);
        assert_eq!(llm.calls(), 1);
        assert_eq!(cache.generation(), 1);
    }
}
