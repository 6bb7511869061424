pub mod config;
pub mod engine;
pub mod gateway;
pub mod model;
pub mod search;
pub mod ui;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::gateway::http::HttpGateway;
use crate::gateway::Gateway;

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "ontc",
    version,
    about = "Operator console for placing ONTs in a fiber-access inventory"
)]
pub struct Cli {
    /// Base URL of the inventory API
    #[arg(long, env = "ONTC_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Bearer token for the inventory API
    #[arg(long, env = "ONTC_API_TOKEN")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive console
    Tui,
    /// Export the full endpoint inventory as CSV
    Export {
        /// Destination file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Upload a CSV of endpoints and print the import summary
    Import { file: PathBuf },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let gateway = HttpGateway::new(&cli.api_url, cli.token.clone());
    match cli.command {
        Commands::Tui => ui::tui::run_tui(Box::new(gateway)).await,
        Commands::Export { output } => run_export(&gateway, output).await,
        Commands::Import { file } => run_import(&gateway, &file).await,
    }
}

async fn run_export(gateway: &HttpGateway, output: Option<PathBuf>) -> Result<()> {
    let bytes = gateway.export_csv().await?;
    match output {
        Some(path) => {
            std::fs::write(&path, &bytes).with_context(|| format!("write {}", path.display()))?;
            eprintln!("wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => std::io::stdout().write_all(&bytes)?,
    }
    Ok(())
}

async fn run_import(gateway: &HttpGateway, file: &PathBuf) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("read {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("import.csv");
    let summary = gateway.import_csv(filename, bytes).await?;
    println!("{}", summary.summary_line());
    for error in &summary.errors {
        println!("  error: {error}");
    }
    Ok(())
}

/// The console owns the terminal, so logs go to a file in the data dir.
/// `RUST_LOG` overrides the default `info` filter.
fn init_tracing() -> Result<()> {
    let dir = default_data_dir();
    std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("ontc.log"))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(file)
        .with_ansi(false)
        .init();
    Ok(())
}

pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "ont-console", "ont-console")
        .expect("project dirs available")
        .data_dir()
        .to_path_buf()
}
