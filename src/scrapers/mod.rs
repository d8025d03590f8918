//! Article text acquisition.
//!
//! A session starts from either pasted text or a URL. Pasted text is used as
//! is; a URL is downloaded and reduced to its main article body by
//! [`article::WebArticleSource`].
//!
//! Acquisition never fails outright: network errors, non-HTML responses and
//! pages without a recognizable article body all come back as an empty
//! string. Callers apply the [`MIN_ARTICLE_CHARS`] quality gate.

pub mod article;

use crate::models::ArticleText;
use tracing::{info, instrument};

pub use article::WebArticleSource;

/// Texts shorter than this (in characters) are not worth sending to the model.
pub const MIN_ARTICLE_CHARS: usize = 50;

/// Something that can turn an article URL into plain article text.
pub trait ArticleSource {
    /// Fetch `url` and return its main text, or an empty string on any failure.
    async fn fetch_article(&self, url: &str) -> ArticleText;
}

/// Resolve the article text for one session run.
///
/// Non-empty `raw_text` always wins and is returned unchanged. Otherwise a
/// non-empty `url` is fetched through `source`. With neither, the result is
/// empty.
#[instrument(level = "info", skip_all, fields(has_url = url.is_some_and(|u| !u.is_empty()), has_text = raw_text.is_some_and(|t| !t.is_empty())))]
pub async fn acquire<S>(source: &S, url: Option<&str>, raw_text: Option<&str>) -> ArticleText
where
    S: ArticleSource,
{
    if let Some(text) = raw_text.filter(|t| !t.is_empty()) {
        info!(chars = text.chars().count(), "Using pasted article text");
        return text.to_string();
    }
    match url.filter(|u| !u.is_empty()) {
        Some(url) => source.fetch_article(url).await,
        None => String::new(),
    }
}

/// Whether acquired text passes the minimum-length gate.
pub fn is_usable(text: &str) -> bool {
    text.chars().count() >= MIN_ARTICLE_CHARS
}
