//! Main entry point for Desia Translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use desia_translator::cli::commands::{self, Commands, TranslateArgs};

/// Desia Translator - English / Odia / Desia translation tool
#[derive(Parser, Debug)]
#[command(name = "desia-translator", version, about, long_about = None)]
struct Args {
    /// API key for the language model (optional, defaults to OPENAI_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("desia_translator={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Override config with CLI args if provided
    if let Some(api_key) = args.api_key {
        std::env::set_var("OPENAI_API_KEY", api_key);
    }

    match args.command {
        Some(Commands::Server { host, port }) => {
            commands::handle_server(host, port).await?;
        }
        Some(Commands::Translate {
            text,
            source,
            target,
            model,
            no_context,
            full_dictionary,
            llm,
        }) => {
            commands::handle_translate(TranslateArgs {
                text,
                source,
                target,
                model,
                no_context,
                full_dictionary,
                llm,
            })
            .await?;
        }
        Some(Commands::Detect { text }) => {
            commands::handle_detect(text).await?;
        }
        Some(Commands::ExportDataset { dict, sentences, out_dir }) => {
            commands::handle_export_dataset(dict, sentences, out_dir).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
