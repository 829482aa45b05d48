//! Neural (NLLB) backend
//!
//! The loaded model is a process-wide handle: [`NeuralBackend`] builds it on
//! first use through a [`NeuralLoader`] and reuses it afterwards. Concurrent
//! first calls share a single load; a failed load leaves the slot empty.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{LanguageCode, NeuralLocale, TranslationMethod};

/// A loaded sequence-to-sequence translator
#[async_trait]
pub trait NeuralTranslator: Send + Sync {
    /// Translate `text` between two supported locales
    async fn translate(&self, text: &str, source: NeuralLocale, target: NeuralLocale) -> Result<String>;
}

/// Builds the translator handle
#[async_trait]
pub trait NeuralLoader: Send + Sync {
    /// Build a ready-to-use translator
    async fn load(&self) -> Result<Arc<dyn NeuralTranslator>>;
}

/// Lazily initialised neural backend
pub struct NeuralBackend {
    loader: Arc<dyn NeuralLoader>,
    model: OnceCell<Arc<dyn NeuralTranslator>>,
    model_name: String,
}

impl NeuralBackend {
    /// Backend that loads its model through `loader`
    pub fn new(loader: Arc<dyn NeuralLoader>, model_name: impl Into<String>) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
            model_name: model_name.into(),
        }
    }

    /// Backend talking to the configured inference server
    pub fn from_config(config: &TranslatorConfig) -> Result<Self> {
        let loader = HttpNeuralLoader::new(config)?;
        Ok(Self::new(Arc::new(loader), config.neural_model.clone()))
    }

    /// Identifier reported as `model_used`
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Whether the model handle has been built
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// The shared model handle, loading it on first use
    pub async fn handle(&self) -> Result<Arc<dyn NeuralTranslator>> {
        let model = self
            .model
            .get_or_try_init(|| async {
                info!("Loading neural model {}", self.model_name);
                self.loader.load().await
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// Translate between English and Odia
    pub async fn translate(&self, text: &str, source: LanguageCode, target: LanguageCode) -> Result<String> {
        let source = Self::locale(source)?;
        let target = Self::locale(target)?;
        let model = self.handle().await?;
        debug!("Neural translation {} -> {}", source, target);
        model.translate(text.trim(), source, target).await
    }

    fn locale(language: LanguageCode) -> Result<NeuralLocale> {
        language
            .neural_locale()
            .ok_or_else(|| TranslationError::UnsupportedLanguage {
                code: language.to_string(),
                backend: TranslationMethod::Neural.to_string(),
            })
    }
}

/// Request body of the inference server
#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    text: &'a str,
    src_lang: NeuralLocale,
    tgt_lang: NeuralLocale,
    max_length: usize,
    num_beams: usize,
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    translated_text: String,
}

/// Neural translator served over HTTP
#[derive(Debug, Clone)]
pub struct HttpNeuralModel {
    client: reqwest::Client,
    endpoint: String,
    max_length: usize,
    num_beams: usize,
}

#[async_trait]
impl NeuralTranslator for HttpNeuralModel {
    async fn translate(&self, text: &str, source: NeuralLocale, target: NeuralLocale) -> Result<String> {
        let body = InferenceRequest {
            text,
            src_lang: source,
            tgt_lang: target,
            max_length: self.max_length,
            num_beams: self.num_beams,
        };

        let response = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::backend(TranslationMethod::Neural, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TranslationError::backend(
                TranslationMethod::Neural,
                format!("inference error {}: {}", status.as_u16(), error_text),
            ));
        }

        let parsed: InferenceResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::backend(TranslationMethod::Neural, format!("invalid response: {}", e)))?;

        Ok(parsed.translated_text.trim().to_string())
    }
}

/// Connects to the inference server and checks that it is up
#[derive(Debug, Clone)]
pub struct HttpNeuralLoader {
    client: reqwest::Client,
    endpoint: String,
    max_length: usize,
    num_beams: usize,
}

impl HttpNeuralLoader {
    /// Loader for the configured inference server
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.neural_endpoint.trim_end_matches('/').to_string(),
            max_length: config.neural_max_length,
            num_beams: config.neural_num_beams,
        })
    }
}

#[async_trait]
impl NeuralLoader for HttpNeuralLoader {
    async fn load(&self) -> Result<Arc<dyn NeuralTranslator>> {
        let response = self
            .client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await
            .map_err(|e| TranslationError::backend(TranslationMethod::Neural, format!("model unavailable: {}", e)))?;

        if !response.status().is_success() {
            return Err(TranslationError::backend(
                TranslationMethod::Neural,
                format!("model unavailable: health check returned {}", response.status()),
            ));
        }

        Ok(Arc::new(HttpNeuralModel {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            max_length: self.max_length,
            num_beams: self.num_beams,
        }))
    }
}
