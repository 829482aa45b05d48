//! Backend routing and dispatch

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::client::{with_timeout, LanguageModel, OpenAiCompatibleClient};
use crate::core::config::TranslatorConfig;
use crate::core::context::ContextBuilder;
use crate::core::detector::{Detection, ScriptDetector};
use crate::core::dictionary::{DictionaryLimits, DictionarySource};
use crate::core::errors::{Result, TranslationError};
use crate::core::guideline::{Guideline, GuidelineCache};
use crate::core::models::{LanguageCode, TranslationMethod, TranslationRequest, TranslationResult};
use crate::core::neural::NeuralBackend;
use crate::core::prompt;

/// Pick the backend for a language pair
///
/// English and Odia in either direction go to the neural model unless the
/// caller forces the LLM; anything involving Desia needs the LLM.
pub fn route(source: LanguageCode, target: LanguageCode, force_llm: bool) -> TranslationMethod {
    use LanguageCode::*;

    match (source, target) {
        (English | Odia, English | Odia) if !force_llm => TranslationMethod::Neural,
        (English | Odia, English | Odia) => TranslationMethod::Llm,
        (Desia, _) | (_, Desia) => TranslationMethod::Llm,
    }
}

/// Lifecycle of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Accepted, not yet routed
    Received,
    /// Backend chosen
    Routed(TranslationMethod),
    /// Backend call in flight
    Dispatched(TranslationMethod),
    /// Result returned
    Completed,
    /// Failed with an error
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Received => write!(f, "received"),
            RequestState::Routed(method) => write!(f, "routed({})", method),
            RequestState::Dispatched(method) => write!(f, "dispatched({})", method),
            RequestState::Completed => write!(f, "completed"),
            RequestState::Failed => write!(f, "failed"),
        }
    }
}

/// Per-request state tracker
struct Dispatch {
    id: u64,
    state: RequestState,
}

impl Dispatch {
    fn new(id: u64) -> Self {
        debug!("request {}: {}", id, RequestState::Received);
        Self {
            id,
            state: RequestState::Received,
        }
    }

    fn advance(&mut self, next: RequestState) {
        debug!("request {}: {} -> {}", self.id, self.state, next);
        self.state = next;
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.advance(RequestState::Completed),
            Err(e) => {
                warn!("request {} failed: {}", self.id, e);
                self.advance(RequestState::Failed);
            }
        }
        result
    }
}

/// Routes requests to the neural or language-model backend
pub struct BackendRouter {
    neural: Arc<NeuralBackend>,
    llm: Arc<dyn LanguageModel>,
    cache: Arc<GuidelineCache>,
    dictionary: Arc<DictionarySource>,
    context: ContextBuilder,
    detector: ScriptDetector,
    default_model: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl BackendRouter {
    /// Assemble a router from its collaborators
    pub fn new(
        config: &TranslatorConfig,
        neural: Arc<NeuralBackend>,
        llm: Arc<dyn LanguageModel>,
        cache: Arc<GuidelineCache>,
        dictionary: Arc<DictionarySource>,
    ) -> Self {
        let context = ContextBuilder::new(
            Arc::clone(&cache),
            Arc::clone(&dictionary),
            config.context_entry_limit,
            config.unprimed_policy,
        );

        Self {
            neural,
            llm,
            cache,
            dictionary,
            context,
            detector: ScriptDetector::new(),
            default_model: config.default_llm_model.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            next_id: AtomicU64::new(1),
        }
    }

    /// Router wired to the HTTP backends described by `config`
    pub fn from_config(config: &TranslatorConfig) -> Result<Self> {
        let neural = Arc::new(NeuralBackend::from_config(config)?);
        let llm: Arc<dyn LanguageModel> = Arc::new(OpenAiCompatibleClient::new(config)?);
        let dictionary = Arc::new(DictionarySource::new(
            config.dictionary_path.clone(),
            config.sentences_path.clone(),
            DictionaryLimits {
                max_word_rows: config.max_word_rows,
                max_sentence_rows: config.max_sentence_rows,
            },
        ));

        Ok(Self::new(config, neural, llm, Arc::new(GuidelineCache::new()), dictionary))
    }

    /// Model used for LLM requests that name none
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Identifier of the neural model
    pub fn neural_model(&self) -> &str {
        self.neural.model_name()
    }

    /// Translate, choosing the backend by language pair
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        let mut dispatch = Dispatch::new(self.next_id.fetch_add(1, Ordering::Relaxed));

        if request.text.trim().is_empty() {
            return dispatch.finish(Err(TranslationError::InvalidRequest {
                message: "text must not be empty".to_string(),
            }));
        }

        let method = route(request.source, request.target, request.force_llm);
        dispatch.advance(RequestState::Routed(method));

        let result = match method {
            TranslationMethod::Neural => self.dispatch_neural(&mut dispatch, request).await,
            TranslationMethod::Llm => self.dispatch_llm(&mut dispatch, request).await,
        };
        dispatch.finish(result)
    }

    async fn dispatch_neural(&self, dispatch: &mut Dispatch, request: &TranslationRequest) -> Result<TranslationResult> {
        dispatch.advance(RequestState::Dispatched(TranslationMethod::Neural));

        let translated = with_timeout(
            TranslationMethod::Neural,
            self.timeout,
            self.neural.translate(&request.text, request.source, request.target),
        )
        .await?;

        Ok(TranslationResult {
            translated_text: translated,
            model_used: self.neural.model_name().to_string(),
            source: request.source,
            target: request.target,
            method: TranslationMethod::Neural,
        })
    }

    async fn dispatch_llm(&self, dispatch: &mut Dispatch, request: &TranslationRequest) -> Result<TranslationResult> {
        let context = self.context.build(request).await?;
        let model = request.model.clone().unwrap_or_else(|| self.default_model.clone());
        let messages = prompt::translation_messages(&request.text, request.source, request.target, &context);

        dispatch.advance(RequestState::Dispatched(TranslationMethod::Llm));
        info!(
            "LLM translation {} -> {} with {} ({} context chars)",
            request.source,
            request.target,
            model,
            context.chars().count()
        );

        let translated = with_timeout(TranslationMethod::Llm, self.timeout, self.llm.complete(&messages, &model)).await?;

        Ok(TranslationResult {
            translated_text: translated.trim().to_string(),
            model_used: model,
            source: request.source,
            target: request.target,
            method: TranslationMethod::Llm,
        })
    }

    /// Neural-only translation; Desia on either side is rejected
    pub async fn translate_neural(
        &self,
        text: &str,
        source: LanguageCode,
        target: LanguageCode,
    ) -> Result<TranslationResult> {
        for language in [source, target] {
            if language.neural_locale().is_none() {
                return Err(TranslationError::UnsupportedLanguage {
                    code: language.to_string(),
                    backend: TranslationMethod::Neural.to_string(),
                });
            }
        }
        self.translate(&TranslationRequest::new(text, source, target)).await
    }

    /// English to Odia through the neural backend
    pub async fn english_to_odia(&self, text: &str) -> Result<TranslationResult> {
        self.translate_neural(text, LanguageCode::English, LanguageCode::Odia).await
    }

    /// Odia to English through the neural backend
    pub async fn odia_to_english(&self, text: &str) -> Result<TranslationResult> {
        self.translate_neural(text, LanguageCode::Odia, LanguageCode::English).await
    }

    /// Fixed-direction LLM translation with default context behaviour
    pub async fn translate_llm(
        &self,
        text: &str,
        source: LanguageCode,
        target: LanguageCode,
        model: Option<String>,
    ) -> Result<TranslationResult> {
        let request = TranslationRequest::new(text, source, target).with_model(model).force_llm();
        self.translate(&request).await
    }

    /// Odia to Desia through the LLM
    pub async fn odia_to_desia(&self, text: &str, model: Option<String>) -> Result<TranslationResult> {
        self.translate_llm(text, LanguageCode::Odia, LanguageCode::Desia, model).await
    }

    /// Desia to Odia through the LLM
    pub async fn desia_to_odia(&self, text: &str, model: Option<String>) -> Result<TranslationResult> {
        self.translate_llm(text, LanguageCode::Desia, LanguageCode::Odia, model).await
    }

    /// English to Desia through the LLM
    pub async fn english_to_desia(&self, text: &str, model: Option<String>) -> Result<TranslationResult> {
        self.translate_llm(text, LanguageCode::English, LanguageCode::Desia, model).await
    }

    /// Desia to English through the LLM
    pub async fn desia_to_english(&self, text: &str, model: Option<String>) -> Result<TranslationResult> {
        self.translate_llm(text, LanguageCode::Desia, LanguageCode::English, model).await
    }

    /// Prime the guideline cache; `None` uses the default model
    pub async fn prime(&self, model: Option<&str>) -> Result<Arc<Guideline>> {
        let model = model.unwrap_or(&self.default_model);
        self.cache
            .prime(model, &self.dictionary, self.llm.as_ref(), self.timeout)
            .await
    }

    /// Currently cached guideline
    pub async fn guidelines(&self) -> Option<Arc<Guideline>> {
        self.cache.get().await
    }

    /// Script-based language detection
    pub fn detect(&self, text: &str) -> Detection {
        self.detector.detect(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{write_file, FakeLanguageModel, FakeNeuralLoader, FakeNeuralTranslator, SAMPLE_DICTIONARY};

    struct Harness {
        _dir: tempfile::TempDir,
        router: BackendRouter,
        llm: Arc<FakeLanguageModel>,
        loader: Arc<FakeNeuralLoader>,
    }

    fn harness_with(llm: FakeLanguageModel, config: TranslatorConfig) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let words = write_file(dir.path(), "dict.csv", SAMPLE_DICTIONARY);
        let llm = Arc::new(llm);
        let loader = Arc::new(FakeNeuralLoader::new(FakeNeuralTranslator::new()));
        let router = BackendRouter::new(
            &config,
            Arc::new(NeuralBackend::new(loader.clone(), "nllb-test")),
            llm.clone(),
            Arc::new(GuidelineCache::new()),
            Arc::new(DictionarySource::new(words, None, DictionaryLimits::default())),
        );
        Harness {
            _dir: dir,
            router,
            llm,
            loader,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeLanguageModel::new(), TranslatorConfig::default())
    }

    #[test]
    fn test_route_table() {
        use LanguageCode::*;

        assert_eq!(route(English, Odia, false), TranslationMethod::Neural);
        assert_eq!(route(Odia, English, false), TranslationMethod::Neural);
        assert_eq!(route(English, Odia, true), TranslationMethod::Llm);
        for other in LanguageCode::ALL {
            assert_eq!(route(Desia, other, false), TranslationMethod::Llm);
            assert_eq!(route(other, Desia, false), TranslationMethod::Llm);
        }
    }

    #[tokio::test]
    async fn test_english_to_odia_uses_neural_backend() {
        let h = harness();
        let request = TranslationRequest::new("Hello", LanguageCode::English, LanguageCode::Odia);
        let result = h.router.translate(&request).await.unwrap();

        assert_eq!(result.method, TranslationMethod::Neural);
        assert_eq!(result.model_used, "nllb-test");
        assert_eq!(result.translated_text, "eng_Latn>ory_Orya: Hello");
        assert_eq!(h.loader.translations(), 1);
        assert_eq!(h.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_odia_to_desia_without_context_sends_bare_prompt() {
        let h = harness();
        let request = TranslationRequest::new("ଅକଲ୍‌", LanguageCode::Odia, LanguageCode::Desia).with_context(false);
        let result = h.router.translate(&request).await.unwrap();

        assert_eq!(result.method, TranslationMethod::Llm);
        assert_eq!(result.model_used, "gpt-4o-mini");
        assert_eq!(h.loader.translations(), 0);

        let (prompt, model) = h.llm.last_prompt().unwrap();
        assert_eq!(model, "gpt-4o-mini");
        assert!(prompt.starts_with("Translate the following text from Odia to Desia."));
        assert!(prompt.ends_with("ଅକଲ୍‌"));
    }

    #[tokio::test]
    async fn test_llm_prompt_carries_dictionary_subset() {
        let h = harness();
        let request = TranslationRequest::new("ଅଖ", LanguageCode::Odia, LanguageCode::Desia)
            .with_model(Some("gpt-4o".to_string()));
        let result = h.router.translate(&request).await.unwrap();

        assert_eq!(result.model_used, "gpt-4o");
        let (prompt, _) = h.llm.last_prompt().unwrap();
        assert!(prompt.contains("ଅଖ → ଆଖି"));
        assert!(!prompt.contains("ପିଲା → ଛୁଆ"));
    }

    #[tokio::test]
    async fn test_full_dictionary_uses_primed_guideline() {
        let h = harness();
        let guideline = h.router.prime(Some("m1")).await.unwrap();
        assert_eq!(h.router.guidelines().await.unwrap().model, "m1");

        let request = TranslationRequest::new("Good morning", LanguageCode::English, LanguageCode::Desia)
            .with_full_dictionary(true);
        h.router.translate(&request).await.unwrap();

        let (prompt, _) = h.llm.last_prompt().unwrap();
        assert!(prompt.starts_with(&guideline.text));
    }

    #[tokio::test]
    async fn test_full_dictionary_before_priming_is_not_primed() {
        let h = harness();
        let request = TranslationRequest::new("ଅଖ", LanguageCode::Odia, LanguageCode::Desia).with_full_dictionary(true);
        let result = h.router.translate(&request).await;

        assert!(matches!(result, Err(TranslationError::NotPrimed)));
        assert_eq!(h.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_convenience_routes_force_llm() {
        let h = harness();

        let result = h.router.odia_to_desia("ଅକଲ୍‌", None).await.unwrap();
        assert_eq!((result.source, result.target, result.method), (LanguageCode::Odia, LanguageCode::Desia, TranslationMethod::Llm));

        let result = h.router.desia_to_odia("ବୁଦ୍ଧି", None).await.unwrap();
        assert_eq!((result.source, result.target), (LanguageCode::Desia, LanguageCode::Odia));

        let result = h.router.english_to_desia("Thank you", Some("gpt-4o".to_string())).await.unwrap();
        assert_eq!(result.model_used, "gpt-4o");

        let result = h.router.desia_to_english("ବୁଦ୍ଧି", None).await.unwrap();
        assert_eq!(result.target, LanguageCode::English);

        assert_eq!(h.llm.calls(), 4);
        assert_eq!(h.loader.translations(), 0);
    }

    #[tokio::test]
    async fn test_forced_llm_for_english_odia() {
        let h = harness();
        let request = TranslationRequest::new("Hello", LanguageCode::English, LanguageCode::Odia).force_llm();
        let result = h.router.translate(&request).await.unwrap();
        assert_eq!(result.method, TranslationMethod::Llm);
        assert_eq!(h.loader.loads(), 0);
    }

    #[tokio::test]
    async fn test_neural_rejects_desia() {
        let h = harness();
        let result = h.router.translate_neural("ବୁଦ୍ଧି", LanguageCode::Desia, LanguageCode::Odia).await;
        assert!(matches!(result, Err(TranslationError::UnsupportedLanguage { .. })));
        assert_eq!(h.llm.calls(), 0);

        let result = h.router.english_to_odia("Hello").await.unwrap();
        assert_eq!(result.method, TranslationMethod::Neural);
        let result = h.router.odia_to_english("ଅଖ").await.unwrap();
        assert_eq!(result.translated_text, "ory_Orya>eng_Latn: ଅଖ");
    }

    #[tokio::test]
    async fn test_backend_failure_is_surfaced_once() {
        let h = harness_with(FakeLanguageModel::new().failing("quota exceeded"), TranslatorConfig::default());
        let result = h.router.english_to_desia("Hello", None).await;

        match result {
            Err(TranslationError::BackendFailure { backend, message }) => {
                assert_eq!(backend, TranslationMethod::Llm);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(h.llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let config = TranslatorConfig {
            timeout_ms: 20,
            ..Default::default()
        };
        let h = harness_with(FakeLanguageModel::new().with_delay(Duration::from_secs(5)), config);
        let result = h.router.english_to_desia("Hello", None).await;
        assert!(matches!(result, Err(TranslationError::BackendFailure { .. })));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let h = harness();
        let request = TranslationRequest::new("   ", LanguageCode::English, LanguageCode::Odia);
        assert!(matches!(
            h.router.translate(&request).await,
            Err(TranslationError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_prime_failure_keeps_router_unprimed() {
        let h = harness_with(FakeLanguageModel::new().failing("boom"), TranslatorConfig::default());
        assert!(h.router.prime(None).await.is_err());
        assert!(h.router.guidelines().await.is_none());
    }

    #[test]
    fn test_detect_delegates_to_script_detector() {
        let h = harness();
        assert_eq!(h.router.detect("ଅକଲ୍‌").language, LanguageCode::Odia);
        assert_eq!(h.router.detect("Hello").language, LanguageCode::English);
    }
}
