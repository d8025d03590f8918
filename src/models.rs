//! Data models for article text, extracted locations and the rendered map.
//!
//! This module defines the core data structures used throughout the application:
//! - [`LocationMention`]: A place reference produced by the language model
//! - [`GeocodedPlace`]: A unique place name resolved to coordinates
//! - [`MapView`]: The viewport and marker set for one render pass
//!
//! Everything here lives for a single session run; nothing is persisted
//! except the optional JSON dump of a [`MapView`].

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;

/// Plain article body handed to the location extractor.
pub type ArticleText = String;

/// The two ways a user can hand an article to the session.
///
/// Raw text always takes precedence over the URL when both are present.
#[derive(Debug, Clone, Default)]
pub struct ArticleInput {
    /// Article URL to fetch and extract.
    pub url: Option<String>,
    /// Raw article text pasted by the user.
    pub text: Option<String>,
}

/// A single location reference extracted from article text.
///
/// Field names match the JSON objects the model is asked to return, so the
/// struct deserializes straight from the model reply. Several mentions may
/// share a `name`; uniqueness is only enforced when geocoding.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LocationMention {
    /// The place name as written by the model.
    pub name: String,
    /// Kind of place: city, state, country, landmark, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Model-reported certainty in `[0, 1]`.
    pub confidence: Confidence,
    /// Short summary (at most ~40 words) of what happened there.
    pub summary: String,
}

impl LocationMention {
    /// Confidence exactly as the model wrote it (`0.95`, `1`, `1.0`).
    ///
    /// This is the text shown in marker popups; the value is never rounded.
    pub fn confidence_label(&self) -> String {
        self.confidence.to_string()
    }
}

/// A confidence score that remembers how the model spelled it.
///
/// Integer and float replies stay distinct, so `1` is displayed as `1`
/// and `1.0` as `1.0`. Comparisons go through [`Confidence::value`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Confidence(Number);

impl Confidence {
    /// Numeric value; `NaN` if the number cannot be represented as `f64`.
    pub fn value(&self) -> f64 {
        self.0.as_f64().unwrap_or(f64::NAN)
    }
}

impl From<f64> for Confidence {
    /// Non-finite input becomes `0`.
    fn from(value: f64) -> Self {
        Self(Number::from_f64(value).unwrap_or_else(|| Number::from(0u8)))
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A unique location name resolved by the geocoder.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeocodedPlace {
    /// Join key back to [`LocationMention::name`] (exact, case-sensitive).
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Canonical name reported by the geocoding service.
    pub display_name: String,
}

/// South-west and north-east corners, each as `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Bounds {
    pub south_west: [f64; 2],
    pub north_east: [f64; 2],
}

/// Initial map view: a center/zoom pair, optionally overridden by fitted bounds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Viewport {
    /// `[lat, lon]` the map is first centered on.
    pub center: [f64; 2],
    pub zoom: u8,
    /// When present the map is fitted to these bounds after `center`/`zoom`.
    pub bounds: Option<Bounds>,
}

/// One pin on the map with its popup content.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Marker {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
    /// Confidence as shown in the popup, see [`LocationMention::confidence_label`].
    pub confidence: String,
    pub summary: String,
}

/// Everything needed to draw the map for one session run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MapView {
    pub viewport: Viewport,
    pub markers: Vec<Marker>,
    /// Local timestamp of when the view was composed (RFC 3339).
    pub generated_at: String,
}
