//! CLI command definitions and handlers

use clap::Subcommand;
use std::path::PathBuf;

use crate::core::models::{LanguageCode, TranslationMethod, TranslationRequest};

/// Commands for Desia Translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP API server
    Server {
        /// Bind address (default: 0.0.0.0)
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Listen port (default: 8000)
        #[arg(short, long, default_value_t = 8000)]
        port: u16,
    },

    /// Translate a piece of text
    Translate {
        /// Text to translate
        #[arg(short, long)]
        text: String,

        /// Source language (english, odia, desia or a locale code)
        #[arg(short, long)]
        source: String,

        /// Target language
        #[arg(long)]
        target: String,

        /// Language model to use for LLM translations
        #[arg(short, long)]
        model: Option<String>,

        /// Send no dictionary context to the language model
        #[arg(long)]
        no_context: bool,

        /// Use the primed guidelines instead of a dictionary subset
        #[arg(long)]
        full_dictionary: bool,

        /// Always use the language model, even for English/Odia
        #[arg(long)]
        llm: bool,
    },

    /// Detect the language of a piece of text
    Detect {
        /// Text to classify
        #[arg(short, long)]
        text: String,
    },

    /// Export JSONL fine-tuning datasets from the dictionary sources
    ExportDataset {
        /// Word dictionary CSV (default: DICTIONARY_PATH)
        #[arg(long)]
        dict: Option<PathBuf>,

        /// Sentence corpus CSV (default: SENTENCES_PATH)
        #[arg(long)]
        sentences: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

/// Options of the translate command
#[derive(Debug, Clone)]
pub struct TranslateArgs {
    /// Text to translate
    pub text: String,
    /// Source language name or code
    pub source: String,
    /// Target language name or code
    pub target: String,
    /// Language model override
    pub model: Option<String>,
    /// Skip dictionary context
    pub no_context: bool,
    /// Use the primed guidelines
    pub full_dictionary: bool,
    /// Force the language-model backend
    pub llm: bool,
}

impl TranslateArgs {
    /// Parse the language names and build the router request
    pub fn to_request(&self) -> anyhow::Result<TranslationRequest> {
        let source: LanguageCode = self.source.parse()?;
        let target: LanguageCode = self.target.parse()?;

        let request = TranslationRequest::new(self.text.clone(), source, target)
            .with_model(self.model.clone())
            .with_context(!self.no_context)
            .with_full_dictionary(self.full_dictionary);

        Ok(if self.llm { request.force_llm() } else { request })
    }
}

/// Handle server command
pub async fn handle_server(host: String, port: u16) -> anyhow::Result<()> {
    use crate::server::api::run_server;
    use tracing::info;

    info!("Starting HTTP server on {}:{}", host, port);
    println!("🚀 Server starting on http://{}:{}/api", host, port);

    run_server(host, port).await?;

    Ok(())
}

/// Handle translate command
pub async fn handle_translate(args: TranslateArgs) -> anyhow::Result<()> {
    use crate::core::config::TranslatorConfig;
    use crate::core::router::{route, BackendRouter};
    use std::time::Instant;
    use tracing::info;

    let request = args.to_request()?;
    let config = TranslatorConfig::load()?;
    let router = BackendRouter::from_config(&config)?;

    // Full-dictionary requests need guidelines, and a CLI process starts unprimed
    let method = route(request.source, request.target, request.force_llm);
    if request.use_context && request.use_full_dictionary && method == TranslationMethod::Llm {
        info!("Priming guidelines before translating");
        router.prime(request.model.as_deref()).await?;
    }

    let start_time = Instant::now();
    let result = router.translate(&request).await?;

    info!(
        "Translated {} -> {} via {} in {:?}",
        result.source,
        result.target,
        result.method,
        start_time.elapsed()
    );

    println!("{}", result.translated_text);
    println!("   ({} / {})", result.method, result.model_used);

    Ok(())
}

/// Handle detect command
pub async fn handle_detect(text: String) -> anyhow::Result<()> {
    use crate::core::detector::ScriptDetector;

    if text.is_empty() {
        anyhow::bail!("text must not be empty");
    }

    let detection = ScriptDetector::new().detect(&text);
    let code = detection
        .language
        .neural_locale()
        .map(|l| l.to_string())
        .unwrap_or_else(|| detection.language.to_string());

    println!("{} (confidence {:.2})", code, detection.confidence);

    Ok(())
}

/// Handle dataset export command
pub async fn handle_export_dataset(
    dict: Option<PathBuf>,
    sentences: Option<PathBuf>,
    out_dir: PathBuf,
) -> anyhow::Result<()> {
    use crate::core::config::TranslatorConfig;
    use crate::core::dictionary::DictionaryLimits;
    use crate::processors::dataset::DatasetExporter;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::{Duration, Instant};
    use tracing::info;

    let start_time = Instant::now();
    let config = TranslatorConfig::from_env()?;

    let dict = dict.unwrap_or_else(|| config.dictionary_path.clone());
    let sentences = match sentences.or_else(|| config.sentences_path.clone()) {
        Some(path) => path,
        None => anyhow::bail!("No sentence corpus given and SENTENCES_PATH is empty"),
    };

    info!("Starting dataset export");
    info!("Dictionary: {}", dict.display());
    info!("Sentences: {}", sentences.display());
    info!("Output: {}", out_dir.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Building fine-tuning records");

    let exporter = DatasetExporter::new(DictionaryLimits {
        max_word_rows: config.max_word_rows,
        max_sentence_rows: config.max_sentence_rows,
    });
    let summary = match exporter.export(&dict, &sentences, &out_dir) {
        Ok(summary) => summary,
        Err(e) => {
            pb.finish_with_message("Failed");
            return Err(e.into());
        }
    };

    pb.finish_with_message("Completed");

    let duration = start_time.elapsed();
    println!("\n✅ Dataset export completed!");
    println!(
        "   Word pairs: {} ({} examples)",
        summary.word_pairs_path.display(),
        summary.word_pair_records
    );
    println!(
        "   Sentences: {} ({} examples)",
        summary.sentences_path.display(),
        summary.sentence_records
    );
    println!("   Time: {:?}", duration);

    Ok(())
}
