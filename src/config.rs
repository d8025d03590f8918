//! Process-wide configuration.
//!
//! Configuration is read once at startup from an optional YAML file, then
//! overlaid with command-line and environment values (see [`crate::cli::Cli`]).
//! The resulting [`AppConfig`] is immutable and handed by reference to every
//! component that needs it.
//!
//! # Example
//!
//! ```yaml
//! min_confidence: 0.85
//! llm:
//!   model: gemini-1.5-pro
//!   max_retries: 3
//! geocoder:
//!   user_agent: my-newsroom-map
//! map:
//!   height_px: 700
//! ```

use crate::cli::Cli;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument};

/// Minimum confidence a mention needs to be mapped.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.90;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub geocoder: GeocoderConfig,
    pub fetch: FetchConfig,
    /// Mentions below this confidence are dropped before geocoding.
    pub min_confidence: f64,
    pub map: MapConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            geocoder: GeocoderConfig::default(),
            fetch: FetchConfig::default(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            map: MapConfig::default(),
        }
    }
}

/// Generative-language backend settings.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    /// Never logged; see the manual `Debug` impl.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Extra attempts after the first one. `0` means a single call.
    pub max_retries: usize,
    pub base_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            timeout_secs: 60,
            max_retries: 0,
            base_delay_ms: 1000,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("base_delay_ms", &self.base_delay_ms)
            .finish()
    }
}

/// Place-search service settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub endpoint: String,
    /// Nominatim rejects requests without an identifying client header.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "news-map".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Article download settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("news-map/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Base layer and viewport settings for the rendered map.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MapConfig {
    pub tile_url: String,
    pub attribution: String,
    pub subdomains: String,
    pub max_zoom: u8,
    /// Zoom used when exactly one place is shown.
    pub regional_zoom: u8,
    /// Zoom used before fitting bounds around several places.
    pub world_zoom: u8,
    /// Fraction of the lat/lon span added on each side when fitting bounds.
    pub bounds_margin: f64,
    pub height_px: u32,
    pub popup_max_width: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png".to_string(),
            attribution: concat!(
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> ",
                "contributors &copy; <a href=\"https://carto.com/\">CARTO</a>"
            )
            .to_string(),
            subdomains: "abcd".to_string(),
            max_zoom: 20,
            regional_zoom: 7,
            world_zoom: 2,
            bounds_margin: 0.03,
            height_px: 500,
            popup_max_width: 300,
        }
    }
}

/// Load configuration from a YAML file. Missing keys take their defaults.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<AppConfig, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&raw)?;
    info!("Loaded configuration file");
    Ok(config)
}

/// Process exit status when the configuration cannot be loaded or is invalid.
///
/// Distinct from the session exit statuses (0 rendered, 1 error, 2 warning).
pub const CONFIG_EXIT_CODE: u8 = 3;

/// Load the optional config file, overlay the command line and validate.
pub fn resolve_config(cli: &Cli) -> Result<AppConfig, Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    }
    .apply_cli(cli);
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    /// Overlay command-line and environment values on top of this configuration.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(key) = &cli.gemini_api_key {
            self.llm.api_key = Some(key.clone());
        }
        if let Some(model) = &cli.model {
            self.llm.model = model.clone();
        }
        if let Some(min_confidence) = cli.min_confidence {
            self.min_confidence = min_confidence;
        }
        self
    }

    /// Check the values nothing downstream can recover from.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        match self.llm.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err("missing generative API key (set GEMINI_API_KEY or llm.api_key)".into()),
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )
            .into());
        }
        if self.map.bounds_margin < 0.0 {
            return Err("map.bounds_margin must not be negative".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.min_confidence, 0.90);
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.llm.max_retries, 0);
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.map.regional_zoom, 7);
        assert_eq!(config.map.world_zoom, 2);
        assert_eq!(config.map.bounds_margin, 0.03);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "min_confidence: 0.8\nllm:\n  model: gemini-1.5-pro\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.min_confidence, 0.8);
        assert_eq!(config.llm.model, "gemini-1.5-pro");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.geocoder.user_agent, "news-map");
        assert_eq!(config.map, MapConfig::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "geocoder:\n  user_agent: test-agent\nmap:\n  height_px: 700").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.geocoder.user_agent, "test-agent");
        assert_eq!(config.map.height_px, 700);
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config(Path::new("/definitely/not/here.yaml")).is_err());
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let cli = Cli::parse_from([
            "news_map",
            "--text",
            "some text",
            "--gemini-api-key",
            "secret",
            "--model",
            "gemini-2.0-flash",
            "--min-confidence",
            "0.75",
        ]);

        let config = AppConfig::default().apply_cli(&cli);
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.min_confidence, 0.75);
    }

    #[test]
    fn test_validate_requires_api_key() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_err());

        config.llm.api_key = Some("   ".to_string());
        assert!(config.validate().is_err());

        config.llm.api_key = Some("key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("key".to_string());
        config.min_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_config_merges_file_and_cli() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_confidence: 0.75").unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::parse_from(["news_map", "--text", "x", "-c", path, "--gemini-api-key", "k"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.min_confidence, 0.75);
        assert_eq!(config.llm.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_resolve_config_reports_invalid_values() {
        let cli = Cli::parse_from(["news_map", "--text", "x", "--gemini-api-key", "k", "--min-confidence", "1.5"]);
        assert!(resolve_config(&cli).is_err());

        let cli = Cli::parse_from(["news_map", "--text", "x", "--gemini-api-key", "k", "-c", "/nonexistent/news_map.yaml"]);
        assert!(resolve_config(&cli).is_err());
    }

    #[test]
    fn test_config_exit_code_differs_from_session_codes() {
        use crate::session::SessionState;
        let session_codes = [SessionState::Rendered, SessionState::Error, SessionState::Warning]
            .map(crate::session::exit_code);
        assert!(!session_codes.contains(&CONFIG_EXIT_CODE));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = LlmConfig::default();
        config.api_key = Some("super-secret".to_string());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
