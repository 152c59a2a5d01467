use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;

use tokio::runtime::Builder;
use tracing::{debug, info};

use hookgate::blocklist::read_patterns;
use hookgate::cli::{Cli, Commands};
use hookgate::sanitize::sanitize_report;
use hookgate::validator::{EndpointValidator, ValidatorConfig};

fn main() -> Result<ExitCode> {
    // Reports go to stdout, so logs must stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let num_cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    // DNS lookups dominate; a few threads beyond the core count help, capped at 16
    let worker_threads = std::cmp::min(num_cpus + 2, 16);

    debug!("Configuring Tokio runtime with {} worker threads", worker_threads);

    let runtime = Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut patterns = cli.block.clone();
    if let Some(path) = &cli.blocklist_file {
        patterns.extend(read_patterns(path).await?);
    }
    info!("Loaded {} blocklist patterns", patterns.len());

    let config = ValidatorConfig {
        resolve_timeout: Duration::from_millis(cli.timeout_ms),
    };
    let validator = EndpointValidator::new(&patterns, config)?;

    match &cli.command {
        Commands::Check { url } => {
            let report = validator.report(url).await;
            println!("{}", serde_json::to_string_pretty(&sanitize_report(&report))?);
            Ok(if report.safe { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Batch {
            input_file,
            output_file,
            chunk_size,
        } => {
            let rejected = validator
                .process_batch(input_file, output_file.as_ref(), *chunk_size, cli.concurrent_checks)
                .await?;
            Ok(if rejected == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}
