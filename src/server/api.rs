//! HTTP API server implementation

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::TranslatorConfig;
use crate::core::errors::TranslationError;
use crate::core::models::{LanguageCode, NeuralLocale, TranslationMethod, TranslationRequest, TranslationResult};
use crate::core::prompt::estimate_tokens;
use crate::core::router::BackendRouter;

const API_PREFIX: &str = "/api";
const PRIME_PREVIEW_CHARS: usize = 500;
const GUIDELINES_PREVIEW_CHARS: usize = 800;

/// Application state
#[derive(Clone)]
pub struct AppState {
    router: Arc<BackendRouter>,
    llm_enabled: bool,
}

impl AppState {
    /// Build the state from a router and the loaded config
    pub fn new(router: Arc<BackendRouter>, config: &TranslatorConfig) -> Self {
        Self {
            router,
            llm_enabled: config.llm_enabled(),
        }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    services: Vec<String>,
    version: String,
}

#[derive(Serialize)]
struct LanguagesResponse {
    supported: Vec<String>,
    model: String,
    llm_enabled: bool,
}

/// Neural translation request
#[derive(Deserialize)]
pub struct TranslateRequest {
    /// Text to translate
    pub text: String,
    /// Source language or locale code
    pub source_language: String,
    /// Target language or locale code
    pub target_language: String,
}

/// LLM translation request
#[derive(Deserialize)]
pub struct LlmTranslateRequest {
    /// Text to translate
    pub text: String,
    /// Source language
    #[serde(default)]
    pub source_language: Option<String>,
    /// Target language
    #[serde(default)]
    pub target_language: Option<String>,
    /// Language model override
    #[serde(default)]
    pub model: Option<String>,
    /// Send dictionary context (default true)
    #[serde(default = "default_true")]
    pub use_context: bool,
    /// Use the primed guidelines
    #[serde(default)]
    pub use_full_dictionary: bool,
}

fn default_true() -> bool {
    true
}

/// Translation response
#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    /// Translation output
    pub translated_text: String,
    /// Model that produced it
    pub model: String,
    /// Source, as a locale code for neural results
    pub source_language: String,
    /// Target, as a locale code for neural results
    pub target_language: String,
    /// Backend that handled the request
    pub method: TranslationMethod,
}

impl TranslateResponse {
    /// Neural responses report locale codes, LLM responses language names
    fn from_result(result: TranslationResult) -> Self {
        let code = |language: LanguageCode| match (result.method, language.neural_locale()) {
            (TranslationMethod::Neural, Some(locale)) => locale.to_string(),
            _ => language.to_string(),
        };
        Self {
            source_language: code(result.source),
            target_language: code(result.target),
            translated_text: result.translated_text,
            model: result.model_used,
            method: result.method,
        }
    }
}

/// Language detection request
#[derive(Deserialize)]
pub struct DetectRequest {
    /// Text to classify
    pub text: String,
}

/// Language detection response
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    /// Neural locale code of the detected language
    pub language_code: String,
    /// Detection confidence in `[0, 1]`
    pub confidence: f64,
}

/// Query of the priming route
#[derive(Deserialize)]
pub struct PrimeParams {
    /// Model to prime with; the default when absent
    pub model: Option<String>,
}

/// Priming response
#[derive(Debug, Serialize)]
pub struct PrimeResponse {
    /// Always `ok`
    pub status: String,
    /// Model that produced the guidelines
    pub model: String,
    /// Whitespace word count of the guidelines
    pub guidelines_tokens_estimate: usize,
    /// Start of the guideline text
    pub guidelines_preview: String,
}

/// Guideline cache state
#[derive(Debug, Serialize)]
pub struct GuidelinesResponse {
    /// Whether guidelines are cached
    pub primed: bool,
    /// Length of the full guideline text in characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidelines_length: Option<usize>,
    /// Model that produced the guidelines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Start of the guideline text
    pub guidelines: Option<String>,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error body
#[derive(Serialize)]
pub struct ErrorDetail {
    /// Human-readable message
    pub message: String,
    /// Machine-readable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

/// Translation error rendered as a JSON response
#[derive(Debug)]
pub struct ApiError(TranslationError);

impl From<TranslationError> for ApiError {
    fn from(err: TranslationError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError(TranslationError::InvalidRequest {
            message: message.into(),
        })
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            TranslationError::UnsupportedLanguage { .. } | TranslationError::InvalidRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            TranslationError::MissingResource { .. } => StatusCode::NOT_FOUND,
            TranslationError::NotPrimed => StatusCode::CONFLICT,
            TranslationError::BackendFailure { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }

        let kind = if status.is_client_error() {
            "invalid_request_error"
        } else {
            "api_error"
        };
        let body = ErrorResponse {
            error: ErrorDetail {
                message: self.0.to_string(),
                code: Some(self.0.code().to_string()),
                r#type: Some(kind.to_string()),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<axum::Json<T>, ApiError>;

fn parse_language(raw: &str) -> Result<LanguageCode, ApiError> {
    raw.parse::<LanguageCode>().map_err(ApiError::from)
}

fn preview(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

/// Health check handler
async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "ok".to_string(),
        services: vec![TranslationMethod::Neural.to_string(), TranslationMethod::Llm.to_string()],
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn languages(State(state): State<Arc<AppState>>) -> axum::Json<LanguagesResponse> {
    let mut supported: Vec<String> = NeuralLocale::SUPPORTED.iter().map(|l| l.to_string()).collect();
    supported.push(LanguageCode::Desia.to_string());

    axum::Json(LanguagesResponse {
        supported,
        model: state.router.neural_model().to_string(),
        llm_enabled: state.llm_enabled,
    })
}

/// Neural translation handler
async fn translate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TranslateRequest>,
) -> ApiResult<TranslateResponse> {
    let source = parse_language(&payload.source_language)?;
    let target = parse_language(&payload.target_language)?;
    let result = state.router.translate_neural(&payload.text, source, target).await?;
    Ok(axum::Json(TranslateResponse::from_result(result)))
}

/// The declared source of a fixed-direction route must match the route
fn check_source(payload: &TranslateRequest, expected: NeuralLocale) -> Result<(), ApiError> {
    if parse_language(&payload.source_language)? != expected.language() {
        return Err(ApiError::bad_request(format!("source_language must be {}", expected)));
    }
    Ok(())
}

async fn translate_eng_to_odia(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TranslateRequest>,
) -> ApiResult<TranslateResponse> {
    check_source(&payload, NeuralLocale::EngLatn)?;
    let result = state.router.english_to_odia(&payload.text).await?;
    Ok(axum::Json(TranslateResponse::from_result(result)))
}

async fn translate_odia_to_eng(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TranslateRequest>,
) -> ApiResult<TranslateResponse> {
    check_source(&payload, NeuralLocale::OryOrya)?;
    let result = state.router.odia_to_english(&payload.text).await?;
    Ok(axum::Json(TranslateResponse::from_result(result)))
}

async fn detect(State(state): State<Arc<AppState>>, Json(payload): Json<DetectRequest>) -> ApiResult<DetectResponse> {
    if payload.text.is_empty() {
        return Err(ApiError::bad_request("text must not be empty"));
    }

    let detection = state.router.detect(&payload.text);
    let language_code = detection
        .language
        .neural_locale()
        .map(|l| l.to_string())
        .unwrap_or_else(|| detection.language.to_string());

    Ok(axum::Json(DetectResponse {
        language_code,
        confidence: detection.confidence,
    }))
}

fn build_request(payload: LlmTranslateRequest) -> Result<TranslationRequest, ApiError> {
    let source = payload
        .source_language
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("source_language is required"))
        .and_then(parse_language)?;
    let target = payload
        .target_language
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("target_language is required"))
        .and_then(parse_language)?;

    Ok(TranslationRequest::new(payload.text, source, target)
        .with_model(payload.model)
        .with_context(payload.use_context)
        .with_full_dictionary(payload.use_full_dictionary))
}

/// General LLM translation, English/Odia pairs included
async fn llm_translate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LlmTranslateRequest>,
) -> ApiResult<TranslateResponse> {
    let request = build_request(payload)?.force_llm();
    let result = state.router.translate(&request).await?;
    Ok(axum::Json(TranslateResponse::from_result(result)))
}

/// Let the router pick the backend
async fn routed_translate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LlmTranslateRequest>,
) -> ApiResult<TranslateResponse> {
    let request = build_request(payload)?;
    let result = state.router.translate(&request).await?;
    Ok(axum::Json(TranslateResponse::from_result(result)))
}

async fn prime(State(state): State<Arc<AppState>>, Query(params): Query<PrimeParams>) -> ApiResult<PrimeResponse> {
    let guideline = state.router.prime(params.model.as_deref()).await?;

    Ok(axum::Json(PrimeResponse {
        status: "ok".to_string(),
        model: guideline.model.clone(),
        guidelines_tokens_estimate: estimate_tokens(&guideline.text),
        guidelines_preview: preview(&guideline.text, PRIME_PREVIEW_CHARS),
    }))
}

async fn guidelines(State(state): State<Arc<AppState>>) -> axum::Json<GuidelinesResponse> {
    let response = match state.router.guidelines().await {
        Some(guideline) => GuidelinesResponse {
            primed: true,
            guidelines_length: Some(guideline.text.chars().count()),
            model: Some(guideline.model.clone()),
            guidelines: Some(preview(&guideline.text, GUIDELINES_PREVIEW_CHARS)),
        },
        None => GuidelinesResponse {
            primed: false,
            guidelines_length: None,
            model: None,
            guidelines: None,
        },
    };
    axum::Json(response)
}

/// Body of the fixed-direction LLM routes
#[derive(Deserialize)]
pub struct DirectionalRequest {
    /// Text to translate
    pub text: String,
    /// Language model override
    #[serde(default)]
    pub model: Option<String>,
}

async fn odia_to_desia(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DirectionalRequest>,
) -> ApiResult<TranslateResponse> {
    let result = state.router.odia_to_desia(&payload.text, payload.model).await?;
    Ok(axum::Json(TranslateResponse::from_result(result)))
}

async fn desia_to_odia(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DirectionalRequest>,
) -> ApiResult<TranslateResponse> {
    let result = state.router.desia_to_odia(&payload.text, payload.model).await?;
    Ok(axum::Json(TranslateResponse::from_result(result)))
}

async fn english_to_desia(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DirectionalRequest>,
) -> ApiResult<TranslateResponse> {
    let result = state.router.english_to_desia(&payload.text, payload.model).await?;
    Ok(axum::Json(TranslateResponse::from_result(result)))
}

async fn desia_to_english(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DirectionalRequest>,
) -> ApiResult<TranslateResponse> {
    let result = state.router.desia_to_english(&payload.text, payload.model).await?;
    Ok(axum::Json(TranslateResponse::from_result(result)))
}

/// Build the axum router
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/languages", get(languages))
        .route("/translate", post(translate))
        .route("/translate_eng_to_odia", post(translate_eng_to_odia))
        .route("/translate_odia_to_eng", post(translate_odia_to_eng))
        .route("/detect", post(detect))
        .route("/route", post(routed_translate))
        .route("/llm/translate", post(llm_translate))
        .route("/llm/prime", post(prime))
        .route("/llm/guidelines", get(guidelines))
        .route("/llm/odia_to_desia", post(odia_to_desia))
        .route("/llm/desia_to_odia", post(desia_to_odia))
        .route("/llm/english_to_desia", post(english_to_desia))
        .route("/llm/desia_to_english", post(desia_to_english))
        .with_state(state);

    Router::new().nest(API_PREFIX, api)
}

/// Run the HTTP server
pub async fn run_server(host: String, port: u16) -> anyhow::Result<()> {
    let config = TranslatorConfig::load()?;
    let router = Arc::new(BackendRouter::from_config(&config)?);
    let state = Arc::new(AppState::new(router, &config));

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
