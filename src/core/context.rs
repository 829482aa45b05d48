//! Per-request prompt context
//!
//! | use_context | use_full_dictionary | primed | context                        |
//! |-------------|---------------------|--------|--------------------------------|
//! | false       | any                 | any    | empty                          |
//! | true        | false               | any    | relevant dictionary subset     |
//! | true        | true                | yes    | cached guideline, verbatim     |
//! | true        | true                | no     | `NotPrimed`, or subset when the policy allows |

use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::config::UnprimedPolicy;
use crate::core::dictionary::DictionarySource;
use crate::core::errors::{Result, TranslationError};
use crate::core::guideline::GuidelineCache;
use crate::core::models::TranslationRequest;

const SUBSET_HEADER: &str = "Reference dictionary (Odia → Desia), use these word choices where they apply:";

/// Builds the context string placed in front of LLM instructions
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    cache: Arc<GuidelineCache>,
    dictionary: Arc<DictionarySource>,
    entry_limit: usize,
    policy: UnprimedPolicy,
}

impl ContextBuilder {
    /// Create a builder over the shared cache and dictionary
    pub fn new(
        cache: Arc<GuidelineCache>,
        dictionary: Arc<DictionarySource>,
        entry_limit: usize,
        policy: UnprimedPolicy,
    ) -> Self {
        Self {
            cache,
            dictionary,
            entry_limit,
            policy,
        }
    }

    /// Context string for `request`; empty when no context applies
    pub async fn build(&self, request: &TranslationRequest) -> Result<String> {
        if !request.use_context {
            return Ok(String::new());
        }

        if request.use_full_dictionary {
            if let Some(guideline) = self.cache.get().await {
                if let Some(model) = request.model.as_deref() {
                    if model != guideline.model {
                        debug!("Using guidelines primed with {} for a {} request", guideline.model, model);
                    }
                }
                return Ok(guideline.text.clone());
            }

            match self.policy {
                UnprimedPolicy::Fail => return Err(TranslationError::NotPrimed),
                UnprimedPolicy::Subset => {
                    warn!("Full dictionary requested before priming, falling back to relevant entries");
                }
            }
        }

        self.relevant_subset(&request.text).await
    }

    async fn relevant_subset(&self, text: &str) -> Result<String> {
        let store = self.dictionary.current().await?;
        let entries = store.lookup(text, self.entry_limit);
        if entries.is_empty() {
            return Ok(String::new());
        }

        let lines = entries.iter().map(|e| e.render()).collect::<Vec<_>>().join("\n");
        Ok(format!("{}\n{}", SUBSET_HEADER, lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dictionary::DictionaryLimits;
    use crate::core::models::LanguageCode;
    use crate::core::testing::{write_file, FakeLanguageModel, SAMPLE_DICTIONARY};
    use std::time::Duration;

    struct Fixture {
        _dir: tempfile::TempDir,
        cache: Arc<GuidelineCache>,
        dictionary: Arc<DictionarySource>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let words = write_file(dir.path(), "dict.csv", SAMPLE_DICTIONARY);
        Fixture {
            _dir: dir,
            cache: Arc::new(GuidelineCache::new()),
            dictionary: Arc::new(DictionarySource::new(words, None, DictionaryLimits::default())),
        }
    }

    fn builder(fixture: &Fixture, policy: UnprimedPolicy) -> ContextBuilder {
        ContextBuilder::new(fixture.cache.clone(), fixture.dictionary.clone(), 20, policy)
    }

    fn request(text: &str) -> TranslationRequest {
        TranslationRequest::new(text, LanguageCode::Odia, LanguageCode::Desia)
    }

    #[tokio::test]
    async fn test_no_context_is_empty() {
        let fixture = fixture();
        let context = builder(&fixture, UnprimedPolicy::Fail)
            .build(&request("ଅକଲ୍‌").with_context(false).with_full_dictionary(true))
            .await
            .unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn test_subset_lists_matching_entries_only() {
        let fixture = fixture();
        let context = builder(&fixture, UnprimedPolicy::Fail)
            .build(&request("ଅନେକ ପିଲା"))
            .await
            .unwrap();

        assert!(context.starts_with(SUBSET_HEADER));
        assert!(context.contains("ଅନେକ → ବେସି"));
        assert!(context.contains("ପିଲା → ଛୁଆ"));
        assert!(!context.contains("ଅଖ → ଆଖି"));
    }

    #[tokio::test]
    async fn test_subset_without_matches_is_empty() {
        let fixture = fixture();
        let context = builder(&fixture, UnprimedPolicy::Fail)
            .build(&request("Good morning"))
            .await
            .unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn test_full_dictionary_returns_guideline_verbatim() {
        let fixture = fixture();
        let llm = FakeLanguageModel::new();
        let guideline = fixture
            .cache
            .prime("m1", &fixture.dictionary, &llm, Duration::from_secs(5))
            .await
            .unwrap();

        let context = builder(&fixture, UnprimedPolicy::Fail)
            .build(&request("ଅକଲ୍‌").with_full_dictionary(true))
            .await
            .unwrap();
        assert_eq!(context, guideline.text);
    }

    #[tokio::test]
    async fn test_guideline_from_another_model_is_served_without_repriming() {
        let fixture = fixture();
        let llm = FakeLanguageModel::new();
        let guideline = fixture
            .cache
            .prime("m1", &fixture.dictionary, &llm, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(llm.calls(), 1);

        let context = builder(&fixture, UnprimedPolicy::Fail)
            .build(
                &request("ଅକଲ୍‌")
                    .with_model(Some("m2".to_string()))
                    .with_full_dictionary(true),
            )
            .await
            .unwrap();

        assert_eq!(context, guideline.text);
        assert_eq!(fixture.cache.get().await.unwrap().model, "m1");
        assert_eq!(fixture.cache.generation(), 1);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_full_dictionary_before_priming_fails_by_default() {
        let fixture = fixture();
        let result = builder(&fixture, UnprimedPolicy::Fail)
            .build(&request("ଅକଲ୍‌").with_full_dictionary(true))
            .await;
        assert!(matches!(result, Err(TranslationError::NotPrimed)));
    }

    #[tokio::test]
    async fn test_full_dictionary_before_priming_can_fall_back() {
        let fixture = fixture();
        let context = builder(&fixture, UnprimedPolicy::Subset)
            .build(&request("ଅଖ").with_full_dictionary(true))
            .await
            .unwrap();
        assert!(context.contains("ଅଖ → ଆଖି"));
    }

    #[tokio::test]
    async fn test_missing_dictionary_surfaces_for_subset() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ContextBuilder::new(
            Arc::new(GuidelineCache::new()),
            Arc::new(DictionarySource::new(dir.path().join("absent.csv"), None, DictionaryLimits::default())),
            20,
            UnprimedPolicy::Fail,
        );
        let result = builder.build(&request("ଅଖ")).await;
        assert!(matches!(result, Err(TranslationError::MissingResource { .. })));
    }
}
