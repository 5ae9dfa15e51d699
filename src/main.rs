use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use revoice::cli::{Cli, Commands};
use revoice::config::{ApiKey, Config, Credentials};
use revoice::{output, utils, Pipeline};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let default_filter = if cli.verbose { "revoice=debug" } else { "revoice=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so stdout stays clean for summaries
    let fmt_layer = if cli.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Run {
            url,
            deepgram_key,
            elevenlabs_key,
            output_dir,
            output,
            timeout,
            transcript_out,
            format,
        } => {
            let credentials = Credentials::new(
                require_key(deepgram_key, "--deepgram-key", "DEEPGRAM_API_KEY")?,
                require_key(elevenlabs_key, "--elevenlabs-key", "ELEVENLABS_API_KEY")?,
            );

            let mut config = Config::load(cli.config.as_deref())?;
            if output_dir.is_some() {
                config.app.output_dir = output_dir;
            }
            if output.is_some() {
                config.app.speech_output = output;
            }
            if timeout.is_some() {
                config.app.request_timeout_secs = timeout;
            }
            config.validate().context("Invalid settings")?;

            // Check for required external tools (non-fatal, yt-dlp reports the real error)
            for dep in utils::check_dependencies(&config.fetch.yt_dlp_path).await {
                if !dep.available {
                    tracing::warn!("{} not found - {}", dep.command, dep.purpose);
                }
            }

            let pipeline = Pipeline::from_config(&config, &credentials)?.with_progress(!cli.quiet);

            tracing::info!("Starting the process for URL: {}", url);
            match pipeline.run(&url).await {
                Ok(result) => {
                    if let Some(path) = transcript_out {
                        output::save_transcript(&result, &path).await?;
                        tracing::info!("Transcript saved to: {}", path.display());
                    }
                    output::print_summary(&result, &format)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!(
                        "{} {} stage failed: {}",
                        style("Process failed.").red().bold(),
                        e.stage(),
                        e
                    );
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Config { show, init } => {
            if init {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => Config::config_path()?,
                };
                if path.exists() {
                    anyhow::bail!("Config file already exists: {}", path.display());
                }
                Config::default().save(&path)?;
                println!("Default configuration written to: {}", path.display());
            }

            if show || !init {
                Config::load(cli.config.as_deref())?.display();
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => {
            let config = Config::load(cli.config.as_deref())?;
            let deps = utils::check_dependencies(&config.fetch.yt_dlp_path).await;

            let mut all_available = true;
            for dep in &deps {
                if dep.available {
                    println!("  {} {}", style("✓").green(), dep.command);
                } else {
                    all_available = false;
                    println!("  {} {} - {}", style("✗").red(), dep.command, dep.purpose);
                }
            }

            Ok(if all_available { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

fn require_key(value: Option<String>, flag: &str, env: &str) -> Result<ApiKey> {
    let key = ApiKey::new(value.unwrap_or_default());
    if key.is_empty() {
        anyhow::bail!("Missing API key: pass {} or set {}", flag, env);
    }
    Ok(key)
}
