use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod analysis;
mod config;
mod error;
mod history;
mod ingest;
mod models;
mod report;
mod risk;
mod scale;
mod stats;

use config::Config;
use error::PersistenceError;
use history::HistoryStore;

#[derive(Parser)]
#[command(name = "cohort-risk")]
#[command(about = "Student risk analysis for cohort performance sheets", long_about = None)]
struct Cli {
    /// Path to a config file (defaults to .cohort-risk.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding saved reports
    #[arg(long, global = true, env = "COHORT_RISK_HISTORY_DIR")]
    history_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a sheet, print the cohort overview and save it to history
    Analyze {
        /// CSV file, or a workbook directory with one CSV per sheet
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
        /// Also write the report as JSON
        #[arg(long)]
        json_out: Option<PathBuf>,
        #[arg(long)]
        no_history: bool,
    },
    /// Write the at-risk markdown document
    #[command(group(
        ArgGroup::new("source")
            .args(["input", "history"])
            .required(true)
            .multiple(false)
    ))]
    Export {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Saved report file name
        #[arg(long)]
        history: Option<String>,
        #[arg(long)]
        sheet: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Browse saved reports
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
    /// Write a default .cohort-risk.toml
    InitConfig,
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List saved reports, newest first
    List,
    /// Print a saved report as JSON
    Show { filename: String },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        info!("Loading config from {}", path.display());
        return Config::load(path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded {}", config::DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(err) => {
            warn!("Ignoring {}: {err:#}", config::DEFAULT_CONFIG_FILE);
            Ok(Config::default())
        }
    }
}

fn handle_init_config() -> anyhow::Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }

    std::fs::write(path, Config::default_toml()?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Created {} with default settings.", path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(dir) = cli.history_dir {
        config.history.dir = dir;
    }
    let store = HistoryStore::new(config.history.dir.clone());

    match cli.command {
        Commands::Analyze {
            input,
            sheet,
            json_out,
            no_history,
        } => {
            if let Some(sheet) = sheet {
                config.ingest.sheet_name = sheet;
            }

            let mut report = analysis::analyze_path(&input, &config.ingest)
                .with_context(|| format!("failed to analyze {}", input.display()))?;

            if config.history.enabled && !no_history {
                match store.save(&report) {
                    Ok(filename) => report.history_filename = Some(filename),
                    Err(err) => warn!("Report not saved to {}: {err}", store.dir().display()),
                }
            }

            print!("{}", report::render_overview(&report));

            if let Some(path) = json_out {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("JSON written to {}.", path.display());
            }
        }
        Commands::Export {
            input,
            history,
            sheet,
            out,
        } => {
            if let Some(sheet) = sheet {
                config.ingest.sheet_name = sheet;
            }

            let report = match (input, history) {
                (Some(input), _) => analysis::analyze_path(&input, &config.ingest)
                    .with_context(|| format!("failed to analyze {}", input.display()))?,
                (None, Some(filename)) => store.load(&filename)?,
                (None, None) => anyhow::bail!("either --input or --history is required"),
            };

            let out = out.unwrap_or(config.export.output);
            std::fs::write(&out, report::render_document(&report))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::History { action } => match action {
            HistoryCommand::List => {
                let summaries = store.list()?;
                if summaries.is_empty() {
                    println!("No saved reports in {}.", store.dir().display());
                }
                for summary in &summaries {
                    println!(
                        "- {} | {} | group {} | {} | {} high risk",
                        summary.filename,
                        summary.company,
                        summary.group,
                        summary.date,
                        summary.high_risk
                    );
                }
            }
            HistoryCommand::Show { filename } => match store.load(&filename) {
                Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                Err(PersistenceError::NotFound(name)) => {
                    eprintln!("No saved report named {name}.");
                    std::process::exit(2);
                }
                Err(err) => return Err(err.into()),
            },
        },
        Commands::InitConfig => handle_init_config()?,
    }

    Ok(())
}
