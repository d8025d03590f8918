//! Command-line interface definitions for News Map.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials and the model name can also come from environment variables
//! (a `.env` file in the working directory is honoured).

use clap::{ArgGroup, Parser};
use std::error::Error;
use std::io::Read;
use std::path::PathBuf;

/// Command-line arguments for the News Map application.
///
/// One invocation is one user action: the article is acquired, its
/// locations extracted, geocoded and written out as a map page.
///
/// # Examples
///
/// ```sh
/// # Map an article by URL
/// news_map --url https://example.com/news/floods -o floods.html
///
/// # Map pasted text, reading it from stdin
/// pbpaste | news_map --text-file - -o map.html
///
/// # Lower the confidence bar and keep a JSON copy of the view
/// news_map -u https://example.com/a --min-confidence 0.8 --json-output view.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(group(ArgGroup::new("input").required(true).multiple(true).args(["url", "text", "text_file"])))]
pub struct Cli {
    /// News article URL to fetch
    #[arg(short, long)]
    pub url: Option<String>,

    /// Raw article text (takes precedence over --url)
    #[arg(short, long, conflicts_with = "text_file")]
    pub text: Option<String>,

    /// Read raw article text from a file, or from stdin when given `-`
    #[arg(long)]
    pub text_file: Option<PathBuf>,

    /// Where to write the rendered HTML map
    #[arg(short, long, default_value = "news_map.html")]
    pub output: PathBuf,

    /// Optional path for a JSON copy of the rendered map view
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model identifier (defaults to the config file value, then gemini-1.5-flash)
    #[arg(long, env = "GEMINI_MODEL")]
    pub model: Option<String>,

    /// Minimum confidence a location needs to be mapped (default 0.90)
    #[arg(long)]
    pub min_confidence: Option<f64>,
}

impl Cli {
    /// Resolve the raw article text from `--text` or `--text-file`.
    pub fn raw_text(&self) -> Result<Option<String>, Box<dyn Error>> {
        if let Some(text) = &self.text {
            return Ok(Some(text.clone()));
        }
        match &self.text_file {
            Some(path) if path.as_os_str() == "-" => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                Ok(Some(buf))
            }
            Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }
}
