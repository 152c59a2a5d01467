//! Command-line interface for hookgate
//!
//! Lets operators run the webhook endpoint checks outside the application:
//! one URL at a time with `check`, or a file of URLs with `batch`. The
//! blocklist is assembled from repeated `--block` options, the
//! `HOOKGATE_BLOCKLIST` environment variable and an optional pattern file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main command-line interface structure for hookgate
///
/// Global options configure the validator and apply to every subcommand.
///
/// # Examples
///
/// ```
/// use clap::Parser;
/// use hookgate::cli::{Cli, Commands};
///
/// let cli = Cli::parse_from([
///     "hookgate", "--block", "10.0.0.0/8", "--block", "*.corp.example",
///     "check", "--url", "https://hooks.example.com/",
/// ]);
/// assert_eq!(cli.block, vec!["10.0.0.0/8", "*.corp.example"]);
/// assert!(matches!(cli.command, Commands::Check { .. }));
/// ```
#[derive(Parser)]
#[command(
    name = "hookgate",
    about = "SSRF safety checks for outbound webhook endpoints",
    version
)]
pub struct Cli {
    /// Command to execute (single URL check or batch processing)
    #[command(subcommand)]
    pub command: Commands,

    /// Blocked destination: IP, CIDR range, hostname or *.domain wildcard.
    /// May be given several times, or as a comma separated list in
    /// HOOKGATE_BLOCKLIST
    #[arg(short = 'b', long, env = "HOOKGATE_BLOCKLIST", value_delimiter = ',')]
    pub block: Vec<String>,

    /// File with one blocklist pattern per line ('#' starts a comment line)
    #[arg(long)]
    pub blocklist_file: Option<PathBuf>,

    /// DNS resolution timeout in milliseconds; a slower lookup rejects the URL
    #[arg(short = 't', long, default_value = "3000")]
    pub timeout_ms: u64,

    /// Number of URLs checked in parallel in batch mode
    #[arg(short = 'c', long, default_value = "50")]
    pub concurrent_checks: usize,
}

/// Available subcommands for the hookgate CLI
///
/// ```text
/// hookgate check --url https://hooks.example.com/notify
/// hookgate --blocklist-file blocked.txt batch --input-file urls.txt --output-file report.jsonl
/// ```
#[derive(Subcommand)]
pub enum Commands {
    /// Check a single endpoint URL
    ///
    /// Prints a JSON report. The exit status is 0 when the endpoint is
    /// safe and 1 when it is rejected.
    Check {
        /// Endpoint URL to check (e.g., https://hooks.example.com/notify)
        #[arg(short, long)]
        url: String,
    },
    /// Check endpoint URLs listed in a file
    ///
    /// Reads one URL per line and writes one JSON report per URL. Empty
    /// lines and those starting with '#' are skipped.
    Batch {
        /// Input file containing endpoint URLs (one per line)
        #[arg(short, long)]
        input_file: PathBuf,

        /// Output file for reports (JSON lines)
        /// If not specified, reports are printed to stdout
        #[arg(short, long)]
        output_file: Option<PathBuf>,

        /// Number of URLs read and reported per chunk
        #[arg(long, default_value = "1000")]
        chunk_size: usize,
    },
}
