//! # News Map
//!
//! Extracts the geographic locations a news article talks about and plots
//! them on an interactive map, each pin annotated with the model's
//! confidence and a short summary of what happened there.
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... news_map --url https://example.com/news/floods -o floods.html
//! ```
//!
//! ## Architecture
//!
//! One invocation is one session run, a strictly sequential pipeline:
//! 1. **Acquisition**: Use the pasted text, or fetch the URL and extract its main body
//! 2. **Extraction**: Ask Gemini for a JSON list of locations and parse it defensively
//! 3. **Filtering**: Keep mentions at or above the confidence threshold
//! 4. **Geocoding**: Resolve each distinct name once via Nominatim
//! 5. **Output**: Compose the map view and write a Leaflet HTML page (and optional JSON)

use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod geocode;
mod locations;
mod models;
mod outputs;
mod scrapers;
mod session;
mod utils;

use api::build_asker;
use cli::Cli;
use config::{CONFIG_EXIT_CODE, resolve_config};
use geocode::NominatimGeocoder;
use models::ArticleInput;
use outputs::{html, json};
use scrapers::WebArticleSource;
use session::{Outcome, Session, SessionState, exit_code};

#[tokio::main]
#[instrument]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "news_map starting up");
    match &dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => warn!(error = %e, "Failed to read .env file"),
    }

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.url, ?args.output, ?args.json_output, "Parsed CLI arguments");

    // ---- Load config ----
    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            eprintln!("configuration error: {e}");
            return Ok(ExitCode::from(CONFIG_EXIT_CODE));
        }
    };
    debug!(?config, "Effective configuration");

    let input = ArticleInput {
        url: args.url.clone(),
        text: args.raw_text()?,
    };

    // ---- Build pipeline ----
    let session = Session::new(
        WebArticleSource::new(&config.fetch)?,
        build_asker(&config.llm)?,
        NominatimGeocoder::new(&config.geocoder)?,
        &config,
    );

    info!(state = %SessionState::Idle, "Session ready");
    let outcome = session.run(&input).await;

    let code = match &outcome {
        Outcome::Rendered(view) => {
            html::write_page(view, &config.map, &args.output).await?;
            if let Some(path) = &args.json_output {
                if let Err(e) = json::write_map_view(view, path).await {
                    error!(path = %path.display(), error = %e, "Failed to write map view JSON");
                }
            }
            println!("{}", args.output.display());
            ExitCode::SUCCESS
        }
        Outcome::Error(_) | Outcome::Warning(_) => {
            eprintln!("{}: {}", outcome.state(), outcome.message().unwrap_or_default());
            ExitCode::from(exit_code(outcome.state()))
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        state = %outcome.state(),
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(code)
}
