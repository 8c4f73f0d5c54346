mod chronology;
mod config;
mod dates;
mod dedup;
mod embedding;
mod errors;
mod extract;
mod intervals;
mod matching;
mod models;
mod progression;
mod report;
mod scoring;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use config::Config;
use models::YearMonth;
use scoring::Analyzer;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "resume-fit")]
#[command(about = "Score how well a resume fits a job description")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a resume against a job description
    Analyze {
        /// Job description text file
        #[arg(short, long)]
        job: PathBuf,

        /// Resume text file
        #[arg(short, long)]
        resume: PathBuf,

        /// Embedding provider (ollama, openai)
        #[arg(long)]
        provider: Option<String>,

        /// Embedding model
        #[arg(short, long)]
        model: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the employment timeline found in a resume (no network)
    Chronology {
        /// Resume text file
        #[arg(short, long)]
        resume: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the default config file location
    Path,

    /// Print the effective configuration
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            job,
            resume,
            provider,
            model,
            json,
        } => {
            if let Some(provider) = provider {
                config.embedding.provider = provider;
            }
            if let Some(model) = model {
                config.embedding.model = model;
            }

            let job_text = read_input(&job)?;
            let resume_text = read_input(&resume)?;

            let embedder = embedding::create_provider(&config.embedding)?;
            let analyzer = Analyzer::new(&config, embedder.as_ref())?;
            let report = analyzer.analyze(&job_text, &resume_text, YearMonth::current())?;

            if json {
                println!("{}", report::to_json(&report)?);
            } else {
                print!("{}", report::render_fit(&report));
            }
        }

        Commands::Chronology { resume, json } => {
            let resume_text = read_input(&resume)?;
            let report =
                chronology::analyze_chronology(&resume_text, YearMonth::current(), &config.chronology)?;

            if json {
                println!("{}", report::to_json(&report)?);
            } else {
                print!("{}", report::render_chronology(&report));
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => match Config::default_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No config directory available on this system."),
            },
            ConfigCommands::Show => println!("{}", report::to_json(&config)?),
        },
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise the level follows the `-v` count.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn read_input(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    info!("Read {} bytes from {}", text.len(), path.display());
    Ok(text)
}
