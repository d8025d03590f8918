//! Session controller: one user action, start to finish.
//!
//! ```text
//! Idle -> Processing -> Error     (article text under 50 characters)
//!                    -> Warning   (no confident mention, or nothing geocoded)
//!                    -> Rendered  (map composed)
//! ```
//!
//! Each run starts from scratch; nothing is remembered between runs apart
//! from the components and configuration the [`Session`] was built with.

use crate::api::AskAsync;
use crate::config::{AppConfig, MapConfig};
use crate::geocode::{Geocode, geocode_mentions};
use crate::locations::{extract_locations, filter_confident};
use crate::models::{ArticleInput, MapView};
use crate::outputs::map;
use crate::scrapers::{self, ArticleSource, MIN_ARTICLE_CHARS};
use std::fmt;
use tracing::{info, instrument, warn};

/// Where a session run is, or where it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Processing,
    Error,
    Warning,
    Rendered,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Processing => "processing",
            SessionState::Error => "error",
            SessionState::Warning => "warning",
            SessionState::Rendered => "rendered",
        };
        f.write_str(s)
    }
}

/// Terminal result of one run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No usable article text; nothing else was attempted.
    Error(String),
    /// The pipeline ran but produced nothing to draw.
    Warning(String),
    Rendered(MapView),
}

impl Outcome {
    pub fn state(&self) -> SessionState {
        match self {
            Outcome::Error(_) => SessionState::Error,
            Outcome::Warning(_) => SessionState::Warning,
            Outcome::Rendered(_) => SessionState::Rendered,
        }
    }

    /// User-facing message for the error and warning states.
    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Error(msg) | Outcome::Warning(msg) => Some(msg),
            Outcome::Rendered(_) => None,
        }
    }
}

/// Process exit status for the state a run ended in.
pub fn exit_code(state: SessionState) -> u8 {
    match state {
        SessionState::Error => 1,
        SessionState::Warning => 2,
        SessionState::Idle | SessionState::Processing | SessionState::Rendered => 0,
    }
}

pub const NO_ARTICLE_TEXT: &str = "No valid article text found";
pub const NO_LOCATIONS: &str = "No locations found.";

fn no_confident_locations(min_confidence: f64) -> String {
    format!("No high-confidence locations found (≥ {min_confidence:.2}).")
}

/// Wires the pipeline stages together.
pub struct Session<S, A, G> {
    source: S,
    asker: A,
    geocoder: G,
    min_confidence: f64,
    map: MapConfig,
}

impl<S, A, G> Session<S, A, G>
where
    S: ArticleSource,
    A: AskAsync<Response = String>,
    G: Geocode,
{
    pub fn new(source: S, asker: A, geocoder: G, config: &AppConfig) -> Self {
        Self {
            source,
            asker,
            geocoder,
            min_confidence: config.min_confidence,
            map: config.map.clone(),
        }
    }

    /// Run the whole pipeline for one user action.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self, input: &ArticleInput) -> Outcome {
        info!(state = %SessionState::Processing, "Session run started");

        let text = scrapers::acquire(&self.source, input.url.as_deref(), input.text.as_deref()).await;
        if !scrapers::is_usable(&text) {
            warn!(
                chars = text.chars().count(),
                min = MIN_ARTICLE_CHARS,
                state = %SessionState::Error,
                "Article text too short"
            );
            return Outcome::Error(NO_ARTICLE_TEXT.to_string());
        }

        let mentions = extract_locations(&self.asker, &text).await;
        let confident = filter_confident(&mentions, self.min_confidence);
        if confident.is_empty() {
            warn!(state = %SessionState::Warning, "No high-confidence locations");
            return Outcome::Warning(no_confident_locations(self.min_confidence));
        }

        let places = geocode_mentions(&self.geocoder, &confident).await;
        match map::compose(&places, &confident, &self.map) {
            Some(view) => {
                info!(state = %SessionState::Rendered, markers = view.markers.len(), "Session run finished");
                Outcome::Rendered(view)
            }
            None => {
                warn!(state = %SessionState::Warning, "No location could be geocoded");
                Outcome::Warning(NO_LOCATIONS.to_string())
            }
        }
    }
}
