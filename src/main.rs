// Search-and-scrape CLI
//
// Runs a single request against the shared headless browser, prints the JSON
// response (or error object) to stdout and closes the browser.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use kodegen_tools_searchscrape::logging::{self, LogFormat};
use kodegen_tools_searchscrape::{ScrapeConfig, SearchRequestBody, WebSearchScraper};
use tracing::error;

/// Search the web and return clean page extracts as JSON
#[derive(Parser)]
#[command(name = "kodegen-searchscrape", version, about)]
struct Cli {
    /// Search query
    #[arg(short, long)]
    query: String,

    /// Number of results to return
    #[arg(short = 'k', long, default_value_t = 5)]
    count: usize,

    /// Return image URLs instead of page extracts
    #[arg(long)]
    images: bool,

    /// Emit logs as JSON objects on stderr
    #[arg(long)]
    json_logs: bool,

    /// Comma-separated engine order, overriding ENGINE_ORDER
    #[arg(long, value_delimiter = ',')]
    engines: Option<Vec<String>>,

    /// Directory for republished images
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<ScrapeConfig> {
    let config = ScrapeConfig::from_env()?;
    if cli.engines.is_none() && cli.storage_dir.is_none() {
        return Ok(config);
    }

    let mut builder = config.to_builder();
    if let Some(engines) = &cli.engines {
        builder = builder.engine_order(engines.iter().map(String::as_str));
    }
    if let Some(dir) = &cli.storage_dir {
        builder = builder.storage_dir(dir.clone());
    }
    Ok(builder.build()?)
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init(config.log_level(), format);

    let scraper = WebSearchScraper::new(config);
    let body = SearchRequestBody {
        query: cli.query.clone(),
        result_count: cli.count,
        want_images: cli.images,
    };

    let outcome = scraper.handle(body).await;
    scraper.shutdown().await;

    match outcome {
        Ok(response) => {
            print_json(&response, cli.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            error!(error_type = %failure.error_type, "{}", failure.error);
            print_json(&failure, cli.pretty)?;
            Ok(ExitCode::FAILURE)
        }
    }
}
