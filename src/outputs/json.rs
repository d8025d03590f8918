//! JSON output of the rendered map view.
//!
//! The file holds the serialized [`MapView`]: viewport, markers with their
//! popup fields, and the generation timestamp.

use crate::models::MapView;
use crate::utils::ensure_parent_dir;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write a [`MapView`] as pretty-printed JSON, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_map_view(view: &MapView, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(view)?;

    if let Err(e) = ensure_parent_dir(path).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e);
    }

    fs::write(path, json).await?;
    info!(markers = view.markers.len(), "Wrote map view JSON");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Marker, Viewport};

    #[tokio::test]
    async fn test_write_map_view() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2025-05-06/view.json");
        let view = MapView {
            viewport: Viewport {
                center: [-6.2, 106.8],
                zoom: 7,
                bounds: None,
            },
            markers: vec![Marker {
                name: "Jakarta".to_string(),
                lat: -6.2,
                lon: 106.8,
                display_name: "Jakarta, Indonesia".to_string(),
                confidence: "0.95".to_string(),
                summary: "Flooding displaced thousands.".to_string(),
            }],
            generated_at: "2025-05-06T08:00:00+07:00".to_string(),
        };

        write_map_view(&view, &path).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["markers"][0]["name"], "Jakarta");
        assert_eq!(written["viewport"]["zoom"], 7);
        assert!(written["viewport"]["bounds"].is_null());
    }
}
