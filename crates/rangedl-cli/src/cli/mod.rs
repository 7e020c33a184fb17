//! CLI for the rangedl chunked downloader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rangedl_core::config;
use std::path::PathBuf;

use commands::{run_checksum, run_config, run_get};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rangedl")]
#[command(about = "rangedl: concurrent chunked object downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download an object over HTTP in parallel chunks.
    Get(GetArgs),

    /// Compute SHA-256 of a file (e.g. after download).
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Print the effective configuration and where it is stored.
    Config,
}

/// Options for `rangedl get`. Unset options fall back to config.toml.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// Object URL.
    pub url: String,

    /// Output file (default: last path segment of the URL).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Download only this byte range, e.g. `bytes=0-1048575`.
    #[arg(long, value_name = "RANGE")]
    pub range: Option<String>,

    /// Download exactly one part of a multipart object.
    #[arg(long, value_name = "N")]
    pub part_number: Option<u32>,

    /// Pin the download to one object version.
    #[arg(long, value_name = "ID")]
    pub version_id: Option<String>,

    /// Split by server-side parts instead of fixed-size byte ranges.
    #[arg(long)]
    pub by_part: bool,

    /// Bytes per ranged request (minimum 5 MiB).
    #[arg(long, value_name = "BYTES")]
    pub part_size: Option<u64>,

    /// Concurrent chunk requests.
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Retries per chunk when a response body breaks off.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Do not pin later chunks to the first chunk's ETag.
    #[arg(long)]
    pub no_consistency: bool,

    /// Extra request header, `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Verify the finished file against this SHA-256 (hex).
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Get(args) => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_get(&cfg, args).await?;
            }
            CliCommand::Checksum { path } => run_checksum(&path).await?,
            CliCommand::Config => run_config().await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
