//! Map composition: viewport fitting and marker assembly.
//!
//! # Viewport
//!
//! - One place: centered on it at the regional zoom.
//! - Several places: centered on the mean latitude/longitude at the world
//!   zoom, then fitted to the bounding box of all places. Each axis of the
//!   box is widened on both sides by `bounds_margin` times its span.
//!
//! # Markers
//!
//! Each geocoded place is matched back to the first filtered mention with
//! exactly the same name; places without a match get no marker.

use crate::config::MapConfig;
use crate::models::{Bounds, GeocodedPlace, LocationMention, MapView, Marker, Viewport};
use chrono::Local;
use itertools::{Itertools, MinMaxResult};
use tracing::{debug, info};

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    match values.minmax_by(f64::total_cmp) {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(min, max) => Some((min, max)),
    }
}

/// Bounding box of `places`, widened by `margin` times the span on each axis.
pub fn fit_bounds(places: &[GeocodedPlace], margin: f64) -> Option<Bounds> {
    let (lat_min, lat_max) = min_max(places.iter().map(|p| p.lat))?;
    let (lon_min, lon_max) = min_max(places.iter().map(|p| p.lon))?;

    let lat_margin = (lat_max - lat_min) * margin;
    let lon_margin = (lon_max - lon_min) * margin;

    Some(Bounds {
        south_west: [lat_min - lat_margin, lon_min - lon_margin],
        north_east: [lat_max + lat_margin, lon_max + lon_margin],
    })
}

/// Initial view for `places`, or `None` when there is nothing to show.
pub fn viewport(places: &[GeocodedPlace], config: &MapConfig) -> Option<Viewport> {
    match places {
        [] => None,
        [only] => Some(Viewport {
            center: [only.lat, only.lon],
            zoom: config.regional_zoom,
            bounds: None,
        }),
        _ => {
            let n = places.len() as f64;
            let avg_lat = places.iter().map(|p| p.lat).sum::<f64>() / n;
            let avg_lon = places.iter().map(|p| p.lon).sum::<f64>() / n;
            Some(Viewport {
                center: [avg_lat, avg_lon],
                zoom: config.world_zoom,
                bounds: fit_bounds(places, config.bounds_margin),
            })
        }
    }
}

/// One marker per place that has a mention with the same name.
pub fn markers(places: &[GeocodedPlace], mentions: &[LocationMention]) -> Vec<Marker> {
    places
        .iter()
        .filter_map(|place| {
            let Some(mention) = mentions.iter().find(|m| m.name == place.name) else {
                debug!(name = %place.name, "No mention matches geocoded place; skipping marker");
                return None;
            };
            Some(Marker {
                name: mention.name.clone(),
                lat: place.lat,
                lon: place.lon,
                display_name: place.display_name.clone(),
                confidence: mention.confidence_label(),
                summary: mention.summary.clone(),
            })
        })
        .collect()
}

/// Compose the map for one session run.
pub fn compose(
    places: &[GeocodedPlace],
    mentions: &[LocationMention],
    config: &MapConfig,
) -> Option<MapView> {
    let viewport = viewport(places, config)?;
    let markers = markers(places, mentions);
    info!(
        markers = markers.len(),
        zoom = viewport.zoom,
        fitted = viewport.bounds.is_some(),
        "Composed map view"
    );
    Some(MapView {
        viewport,
        markers,
        generated_at: Local::now().to_rfc3339(),
    })
}
