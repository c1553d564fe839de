//! Omskriv CLI entry point.

use anyhow::Result;
use clap::Parser;
use omskriv::cli::{commands, Cli, Commands};
use omskriv::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("omskriv={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure the output directory exists
    std::fs::create_dir_all(settings.output_dir())?;

    // Execute command
    match &cli.command {
        Commands::Run {
            input,
            output,
            format,
            title,
            prompt,
            model,
            max_words,
            overlap_words,
        } => {
            commands::run_pipeline(
                input,
                output.clone(),
                format.clone(),
                title.clone(),
                prompt.clone(),
                model.clone(),
                *max_words,
                *overlap_words,
                settings,
            )
            .await?;
        }

        Commands::Fetch {
            input,
            output,
            format,
        } => {
            commands::run_fetch(input, output.clone(), format, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
