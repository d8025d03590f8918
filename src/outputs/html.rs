//! Standalone Leaflet page for a [`MapView`].
//!
//! The page loads Leaflet from a CDN, adds a single light tile layer (no
//! other base layer), one pin per marker with an HTML popup, sets the
//! initial center/zoom and, when the view carries bounds, fits them.
//!
//! All marker text is HTML-escaped before it is placed in a popup, and the
//! embedded JSON has `</` neutralized so it cannot close the script block.

use crate::config::MapConfig;
use crate::models::{Bounds, MapView, Marker};
use crate::utils::ensure_parent_dir;
use quick_xml::escape::escape;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const PAGE_TITLE: &str = "NewsMap - News Article Location Mapper";

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>__TITLE__</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" crossorigin="" />
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js" crossorigin=""></script>
  <style>
    body { margin: 0; font-family: system-ui, sans-serif; }
    h1 { font-size: 1.4rem; margin: 0.75rem 1rem; }
    #map { width: 100%; height: __HEIGHT__px; }
  </style>
</head>
<body>
  <h1>__TITLE__</h1>
  <div id="map"></div>
  <script>
    const view = __VIEW__;
    const map = L.map("map", { crs: L.CRS.EPSG3857 }).setView(view.center, view.zoom);
    L.tileLayer(view.tiles.url, {
      attribution: view.tiles.attribution,
      subdomains: view.tiles.subdomains,
      maxZoom: view.tiles.maxZoom
    }).addTo(map);
    for (const m of view.markers) {
      L.marker([m.lat, m.lon]).bindPopup(m.popup, { maxWidth: view.popupMaxWidth }).addTo(map);
    }
    if (view.bounds) {
      map.fitBounds(view.bounds);
    }
  </script>
</body>
</html>
"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TileLayer<'a> {
    url: &'a str,
    attribution: &'a str,
    subdomains: &'a str,
    max_zoom: u8,
}

#[derive(Serialize)]
struct PinPayload {
    lat: f64,
    lon: f64,
    popup: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PagePayload<'a> {
    center: [f64; 2],
    zoom: u8,
    bounds: Option<[[f64; 2]; 2]>,
    tiles: TileLayer<'a>,
    markers: Vec<PinPayload>,
    popup_max_width: u32,
}

/// Popup body: bold name, the verbatim confidence, then the summary.
pub fn popup_html(marker: &Marker) -> String {
    format!(
        "<b>{}</b><br>Confidence: {}<br>{}",
        escape(marker.name.as_str()),
        escape(marker.confidence.as_str()),
        escape(marker.summary.as_str()),
    )
}

/// Render the full HTML page for `view`.
pub fn render_page(view: &MapView, config: &MapConfig) -> Result<String, Box<dyn Error>> {
    let payload = PagePayload {
        center: view.viewport.center,
        zoom: view.viewport.zoom,
        bounds: view
            .viewport
            .bounds
            .map(|Bounds { south_west, north_east }| [south_west, north_east]),
        tiles: TileLayer {
            url: &config.tile_url,
            attribution: &config.attribution,
            subdomains: &config.subdomains,
            max_zoom: config.max_zoom,
        },
        markers: view
            .markers
            .iter()
            .map(|m| PinPayload {
                lat: m.lat,
                lon: m.lon,
                popup: popup_html(m),
            })
            .collect(),
        popup_max_width: config.popup_max_width,
    };
    let json = serde_json::to_string(&payload)?.replace("</", "<\\/");

    Ok(TEMPLATE
        .replace("__TITLE__", PAGE_TITLE)
        .replace("__HEIGHT__", &config.height_px.to_string())
        .replace("__VIEW__", &json))
}

/// Render `view` and write it to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_page(view: &MapView, config: &MapConfig, path: &Path) -> Result<(), Box<dyn Error>> {
    let page = render_page(view, config)?;
    ensure_parent_dir(path).await?;
    fs::write(path, page).await?;
    info!(markers = view.markers.len(), "Wrote map page");
    Ok(())
}
