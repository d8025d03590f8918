//! Generic web article scraper.
//!
//! Downloads a page and pulls out its main body with a small
//! readability-style heuristic instead of per-site selectors:
//!
//! - Every `<p>` outside navigation, header, footer, aside, form and script
//!   containers is a candidate paragraph if it has at least
//!   [`MIN_PARAGRAPH_CHARS`] characters of text.
//! - Candidate paragraphs are grouped by their parent element, and the
//!   parent holding the most paragraph text is taken as the article body.
//! - The body is that parent's candidate paragraphs, in document order,
//!   separated by blank lines.

use super::ArticleSource;
use crate::config::FetchConfig;
use crate::models::ArticleText;
use crate::utils::normalize_whitespace;
use once_cell::sync::Lazy;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Paragraphs shorter than this are treated as captions, bylines or chrome.
pub const MIN_PARAGRAPH_CHARS: usize = 25;

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));

const BOILERPLATE_CONTAINERS: &[&str] = &[
    "nav", "header", "footer", "aside", "form", "script", "style", "noscript", "figcaption",
];

/// Fetches article pages over HTTP.
#[derive(Debug, Clone)]
pub struct WebArticleSource {
    client: Client,
}

impl WebArticleSource {
    /// Build a source whose requests time out after `config.timeout_secs`.
    pub fn new(config: &FetchConfig) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> Result<Option<String>, Box<dyn Error>> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("unsupported URL scheme: {}", parsed.scheme()).into());
        }

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}").into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        if !is_html(content_type) {
            warn!(content_type = content_type.unwrap_or_default(), "Response is not HTML");
            return Ok(None);
        }

        Ok(Some(response.text().await?))
    }
}

/// Whether a `Content-Type` header denotes an HTML page.
///
/// A missing header is given the benefit of the doubt.
fn is_html(content_type: Option<&str>) -> bool {
    content_type.is_none_or(|ct| ct.to_ascii_lowercase().contains("html"))
}

impl ArticleSource for WebArticleSource {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch_article(&self, url: &str) -> ArticleText {
        let html = match self.download(url).await {
            Ok(Some(html)) => html,
            Ok(None) => return String::new(),
            Err(e) => {
                warn!(error = %e, "Error fetching article");
                return String::new();
            }
        };

        match extract_main_text(&html) {
            Some(text) => {
                info!(chars = text.chars().count(), "Parsed article body");
                text
            }
            None => {
                warn!(bytes = html.len(), "Could not identify an article body");
                String::new()
            }
        }
    }
}

fn in_boilerplate(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| BOILERPLATE_CONTAINERS.contains(&a.value().name()))
}

fn paragraph_text(element: &ElementRef<'_>) -> Option<String> {
    if in_boilerplate(element) {
        return None;
    }
    let text = normalize_whitespace(&element.text().collect::<String>());
    (text.chars().count() >= MIN_PARAGRAPH_CHARS).then_some(text)
}

/// Extract the main article body from an HTML document.
///
/// Returns `None` when no qualifying paragraph exists.
pub fn extract_main_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    // parent node -> (first-seen rank, paragraph texts)
    let mut groups: HashMap<_, (usize, Vec<String>)> = HashMap::new();
    for (rank, element) in document.select(&PARAGRAPH).enumerate() {
        let Some(text) = paragraph_text(&element) else {
            continue;
        };
        let Some(parent) = element.parent() else {
            continue;
        };
        groups
            .entry(parent.id())
            .or_insert_with(|| (rank, Vec::new()))
            .1
            .push(text);
    }

    let best = groups
        .into_values()
        .max_by(|(rank_a, a), (rank_b, b)| {
            let mass_a: usize = a.iter().map(|p| p.chars().count()).sum();
            let mass_b: usize = b.iter().map(|p| p.chars().count()).sum();
            // Ties go to the group that appears first in the document.
            mass_a.cmp(&mass_b).then(rank_b.cmp(rank_a))
        })?;

    debug!(paragraphs = best.1.len(), "Selected article body container");
    Some(best.1.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_http::{closed_port, serve_once};

    const PAGE: &str = r#"
        <html>
          <head><title>Floods</title><script>var p = "<p>not text</p>";</script></head>
          <body>
            <header><p>Breaking news, live updates and the latest headlines here</p></header>
            <nav><p>Home | World | Politics | Business | Climate | Sports</p></nav>
            <div class="sidebar">
              <p>Subscribe to our newsletter for the best daily stories</p>
            </div>
            <article>
              <h1>Floods hit Jakarta</h1>
              <p>Floods hit Jakarta and Bandung yesterday, displacing thousands of residents.</p>
              <p>Short caption</p>
              <p>Officials in the capital said rainfall was the heaviest   in a decade.</p>
              <figure><figcaption><p>Photo credit: a wire service photographer</p></figcaption></figure>
            </article>
            <footer><p>Copyright 2025 Example News. All rights reserved worldwide.</p></footer>
          </body>
        </html>
    "#;

    #[test]
    fn test_extracts_largest_paragraph_group() {
        let text = extract_main_text(PAGE).unwrap();
        assert_eq!(
            text,
            "Floods hit Jakarta and Bandung yesterday, displacing thousands of residents.\n\n\
             Officials in the capital said rainfall was the heaviest in a decade."
        );
    }

    #[test]
    fn test_skips_boilerplate_containers() {
        let text = extract_main_text(PAGE).unwrap();
        assert!(!text.contains("Home | World"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("Photo credit"));
        assert!(!text.contains("Short caption"));
    }

    #[test]
    fn test_no_paragraphs_yields_none() {
        assert!(extract_main_text("<html><body><div>Just a div</div></body></html>").is_none());
        assert!(extract_main_text("").is_none());
    }

    #[test]
    fn test_only_boilerplate_yields_none() {
        let html = "<footer><p>Copyright 2025 Example News. All rights reserved.</p></footer>";
        assert!(extract_main_text(html).is_none());
    }

    #[test]
    fn test_tie_prefers_earlier_group() {
        let html = r#"
            <div id="a"><p>First block of text that is long enough.</p></div>
            <div id="b"><p>Other block of text that is long enough.</p></div>
        "#;
        assert_eq!(
            extract_main_text(html).unwrap(),
            "First block of text that is long enough."
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_empty() {
        let source = WebArticleSource::new(&FetchConfig::default()).unwrap();
        assert_eq!(source.fetch_article("not a url").await, "");
        assert_eq!(source.fetch_article("ftp://example.com/file").await, "");
    }

    #[test]
    fn test_is_html() {
        assert!(is_html(Some("text/html")));
        assert!(is_html(Some("text/html; charset=utf-8")));
        assert!(is_html(Some("application/xhtml+xml")));
        assert!(is_html(Some("TEXT/HTML")));
        assert!(is_html(None));
        assert!(!is_html(Some("application/pdf")));
        assert!(!is_html(Some("application/json")));
    }

    #[tokio::test]
    async fn test_fetches_and_extracts_html_page() {
        let base = serve_once("200 OK", "text/html; charset=utf-8", PAGE).await;
        let source = WebArticleSource::new(&FetchConfig::default()).unwrap();

        let text = source.fetch_article(&format!("{base}/news/floods")).await;
        assert!(text.starts_with("Floods hit Jakarta and Bandung yesterday"));
    }

    #[tokio::test]
    async fn test_not_found_status_is_empty() {
        let base = serve_once("404 Not Found", "text/html", PAGE).await;
        let source = WebArticleSource::new(&FetchConfig::default()).unwrap();

        assert_eq!(source.fetch_article(&format!("{base}/gone")).await, "");
    }

    #[tokio::test]
    async fn test_non_html_content_is_empty() {
        let base = serve_once("200 OK", "application/pdf", PAGE).await;
        let source = WebArticleSource::new(&FetchConfig::default()).unwrap();

        assert_eq!(source.fetch_article(&format!("{base}/report.pdf")).await, "");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_empty() {
        let base = closed_port().await;
        let source = WebArticleSource::new(&FetchConfig::default()).unwrap();

        assert_eq!(source.fetch_article(&format!("{base}/news")).await, "");
    }
}
