//! cdn-ranges - print the IP ranges a CDN service currently uses
//!
//! Writes the cached or freshly fetched range set to stdout as JSON.

use std::process::ExitCode;

use clap::Parser;

use cdn_ranges::cli::{init_tracing, Cli};
use cdn_ranges::RangeFetcher;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_level()) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(e.as_ref());
            ExitCode::FAILURE
        }
    }
}

/// Prints an error followed by each of its causes
fn report(err: &dyn std::error::Error) {
    eprintln!("Error: {}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}

async fn run(cli: &Cli) -> Result<String, Box<dyn std::error::Error>> {
    let config = cli.to_config()?;
    let fetcher = RangeFetcher::new(config)?;
    let ranges = fetcher.get_ranges().await?;
    Ok(serde_json::to_string_pretty(&ranges)?)
}
