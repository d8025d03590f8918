//! Place-name geocoding against OpenStreetMap Nominatim.
//!
//! Each distinct location name is resolved at most once per session with a
//! single-result search. Misses and failures are logged and dropped; they
//! only make the map smaller.

use crate::config::GeocoderConfig;
use crate::models::{GeocodedPlace, LocationMention};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Resolves a place name to coordinates.
pub trait Geocode {
    /// Look up `name`; `None` when nothing matches or the lookup fails.
    async fn geocode(&self, name: &str) -> Option<GeocodedPlace>;
}

/// One entry of a Nominatim `format=json` search reply.
///
/// Nominatim encodes coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

/// Nominatim search client.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
}

impl NominatimGeocoder {
    /// Build a client identifying itself with `config.user_agent`.
    pub fn new(config: &GeocoderConfig) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, name: &str) -> String {
        format!(
            "{}/search?format=json&q={}&limit=1",
            self.endpoint,
            urlencoding::encode(name)
        )
    }

    async fn search(&self, name: &str) -> Result<Vec<NominatimPlace>, Box<dyn Error>> {
        let response = self.client.get(self.search_url(name)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}").into());
        }
        Ok(response.json().await?)
    }
}

/// Turn the first search hit into a [`GeocodedPlace`] keyed by `name`.
fn first_place(name: &str, places: Vec<NominatimPlace>) -> Result<Option<GeocodedPlace>, Box<dyn Error>> {
    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(GeocodedPlace {
        name: name.to_string(),
        lat: place.lat.trim().parse()?,
        lon: place.lon.trim().parse()?,
        display_name: place.display_name,
    }))
}

impl Geocode for NominatimGeocoder {
    #[instrument(level = "info", skip(self))]
    async fn geocode(&self, name: &str) -> Option<GeocodedPlace> {
        let result = match self.search(name).await {
            Ok(places) => first_place(name, places),
            Err(e) => Err(e),
        };

        match result {
            Ok(Some(place)) => {
                debug!(lat = place.lat, lon = place.lon, display_name = %place.display_name, "Geocoded");
                Some(place)
            }
            Ok(None) => {
                info!("No geocoding result");
                None
            }
            Err(e) => {
                warn!(error = %e, "Geocoding failed");
                None
            }
        }
    }
}

/// Distinct mention names, sorted so lookups happen in a stable order.
///
/// Names are compared exactly: `Paris` and `paris` are two names.
pub fn unique_names(mentions: &[LocationMention]) -> Vec<String> {
    mentions
        .iter()
        .map(|m| m.name.clone())
        .sorted()
        .dedup()
        .collect()
}

/// Geocode every distinct name among `mentions`, one request at a time.
#[instrument(level = "info", skip_all, fields(mentions = mentions.len()))]
pub async fn geocode_mentions<G>(geocoder: &G, mentions: &[LocationMention]) -> Vec<GeocodedPlace>
where
    G: Geocode,
{
    let names = unique_names(mentions);
    let total = names.len();

    let places: Vec<GeocodedPlace> = stream::iter(names)
        .then(|name| async move { geocoder.geocode(&name).await })
        .filter_map(std::future::ready)
        .collect()
        .await;

    info!(unique = total, resolved = places.len(), "Geocoded location names");
    places
}
