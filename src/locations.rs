//! Location extraction from article text.
//!
//! The article is sent to the generative backend with a fixed instructional
//! prompt asking for a JSON array of `{name, type, confidence, summary}`
//! objects. The backend gives no structured-output guarantee, so the reply is
//! parsed defensively:
//!
//! 1. Surrounding whitespace is trimmed.
//! 2. A Markdown code fence (with or without a language tag) is stripped.
//! 3. The remainder is parsed as JSON.
//! 4. An object is accepted only if it wraps the array under `locations`.
//! 5. Any other shape or parse failure yields an empty list and a log entry
//!    carrying the raw reply.
//!
//! Mentions are then thresholded by [`filter_confident`].

use crate::api::AskAsync;
use crate::models::LocationMention;
use crate::utils::truncate_for_log;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

/// How much of a rejected reply is kept in the log line.
const RAW_LOG_LIMIT: usize = 2000;

const PROMPT_HEADER: &str = r#"You are an assistant that extracts structured information from news text.

Task:
Identify every real-world location mentioned in the article (cities, states, countries, landmarks).
For each location return an object with:
- "name": the location name (string)
- "type": city, state, country, landmark, etc. (string)
- "confidence": a number between 0.0 and 1.0
- "summary": 1-2 sentences on what the article says happened at that location

Confidence must reflect how certain you are that the text refers to this specific place:
- Clear, unambiguous reference: 0.9 to 1.0
- Likely correct but other places share the name: 0.6 to 0.89
- Vague or indirect mention: 0.3 to 0.59
- Very uncertain: below 0.3

Rules:
- Keep each summary under 40 words.
- If the article describes no specific events at a location, set its summary to "No specific events described."
- Return ONLY a valid JSON array, with no commentary.
- Do not wrap the output in ```json, ``` or any other Markdown formatting.

Input text:
"#;

/// Build the extraction prompt for one article.
pub fn build_prompt(article_text: &str) -> String {
    let mut prompt = String::with_capacity(PROMPT_HEADER.len() + article_text.len());
    prompt.push_str(PROMPT_HEADER);
    prompt.push_str(article_text);
    prompt
}

/// Remove a surrounding Markdown code fence and its optional language tag
/// (`json`, `JSON`, `jsonc`, `json5`, ...).
///
/// Text that does not start with a fence is returned trimmed but otherwise
/// untouched.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = rest.split("```").next().unwrap_or(rest);
    let inner =
        inner.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'));
    inner.trim_matches(|c: char| c == '`' || c.is_whitespace())
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse a raw model reply into location mentions.
///
/// Never fails: anything that is not an array of complete location objects
/// (directly, or under a `locations` key) produces an empty list.
pub fn parse_locations(raw: &str) -> Vec<LocationMention> {
    let body = strip_code_fence(raw);

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                error = %e,
                raw = %truncate_for_log(raw, RAW_LOG_LIMIT),
                "Model reply is not valid JSON"
            );
            return Vec::new();
        }
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("locations") {
            Some(Value::Array(items)) => items,
            other => {
                warn!(
                    found = other.as_ref().map(shape_of).unwrap_or("nothing"),
                    raw = %truncate_for_log(raw, RAW_LOG_LIMIT),
                    "Unexpected response shape: object without a `locations` array"
                );
                return Vec::new();
            }
        },
        other => {
            warn!(
                found = shape_of(&other),
                raw = %truncate_for_log(raw, RAW_LOG_LIMIT),
                "Unexpected response shape: expected a JSON array"
            );
            return Vec::new();
        }
    };

    match serde_json::from_value::<Vec<LocationMention>>(Value::Array(items)) {
        Ok(mentions) => mentions,
        Err(e) => {
            warn!(
                error = %e,
                raw = %truncate_for_log(raw, RAW_LOG_LIMIT),
                "Model reply has malformed location objects"
            );
            Vec::new()
        }
    }
}

/// Ask the generative backend for the locations mentioned in `article_text`.
///
/// Exactly one logical request is made (retries, if any, are the asker's
/// business). A failed call is logged and treated as "no locations".
#[instrument(level = "info", skip_all, fields(chars = article_text.chars().count()))]
pub async fn extract_locations<A>(asker: &A, article_text: &str) -> Vec<LocationMention>
where
    A: AskAsync<Response = String>,
{
    let prompt = build_prompt(article_text);

    let reply = match asker.ask(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(error = %e, "Location extraction request failed");
            return Vec::new();
        }
    };
    debug!(reply = %truncate_for_log(&reply, RAW_LOG_LIMIT), "Model reply");

    let mentions = parse_locations(&reply);
    info!(count = mentions.len(), "Extracted location mentions");
    mentions
}

/// Keep mentions whose confidence is at or above `min_confidence`.
pub fn filter_confident(mentions: &[LocationMention], min_confidence: f64) -> Vec<LocationMention> {
    let kept: Vec<LocationMention> = mentions
        .iter()
        .filter(|m| m.confidence.value() >= min_confidence)
        .cloned()
        .collect();
    info!(
        total = mentions.len(),
        kept = kept.len(),
        min_confidence,
        "Filtered location mentions by confidence"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Confidence;
    use std::error::Error;
    use std::sync::Mutex;

    const JAKARTA_BANDUNG: &str = r#"[{"name":"Jakarta","type":"city","confidence":0.95,"summary":"Flooding displaced thousands."},{"name":"Bandung","type":"city","confidence":0.4,"summary":"Also affected."}]"#;

    fn mention(name: &str, confidence: f64) -> LocationMention {
        LocationMention {
            name: name.to_string(),
            kind: "city".to_string(),
            confidence: confidence.into(),
            summary: format!("Something happened in {name}."),
        }
    }

    struct CannedAsk {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedAsk {
        fn new(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl AskAsync for CannedAsk {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            self.prompts.lock().unwrap().push(text.to_string());
            self.reply.clone().map_err(Into::into)
        }
    }

    #[test]
    fn test_parse_plain_array_preserves_fields() {
        let mentions = parse_locations(JAKARTA_BANDUNG);
        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0], LocationMention {
            name: "Jakarta".to_string(),
            kind: "city".to_string(),
            confidence: Confidence::from(0.95),
            summary: "Flooding displaced thousands.".to_string(),
        });
        assert_eq!(mentions[1].name, "Bandung");
        assert_eq!(mentions[1].confidence.value(), 0.4);
        assert_eq!(mentions[1].summary, "Also affected.");
    }

    #[test]
    fn test_parse_fenced_json_matches_unfenced() {
        let fenced = format!("```json\n{JAKARTA_BANDUNG}\n```");
        assert_eq!(parse_locations(&fenced), parse_locations(JAKARTA_BANDUNG));

        let upper = format!("  ```JSON\n{JAKARTA_BANDUNG}\n```  \n");
        assert_eq!(parse_locations(&upper), parse_locations(JAKARTA_BANDUNG));
    }

    #[test]
    fn test_parse_fence_without_language_tag() {
        let fenced = format!("```\n{JAKARTA_BANDUNG}\n```");
        assert_eq!(parse_locations(&fenced).len(), 2);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```[1]```"), "[1]");
        assert_eq!(strip_code_fence("  [1]  "), "[1]");
        assert_eq!(strip_code_fence("```json"), "");
        assert_eq!(strip_code_fence("```jsonc\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```json5\n{\"a\": 1}\n```"), r#"{"a": 1}"#);
    }

    #[test]
    fn test_parse_fence_with_other_language_tags() {
        for tag in ["jsonc", "json5", "javascript"] {
            let fenced = format!("```{tag}\n{JAKARTA_BANDUNG}\n```");
            assert_eq!(parse_locations(&fenced), parse_locations(JAKARTA_BANDUNG), "tag {tag}");
        }
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_locations("[]").is_empty());
    }

    #[test]
    fn test_parse_object_with_locations_key() {
        let wrapped = format!(r#"{{"locations": {JAKARTA_BANDUNG}}}"#);
        assert_eq!(parse_locations(&wrapped).len(), 2);
    }

    #[test]
    fn test_parse_object_without_locations_is_empty() {
        assert!(parse_locations(r#"{"places": []}"#).is_empty());
        assert!(parse_locations(r#"{"locations": 0}"#).is_empty());
    }

    #[test]
    fn test_parse_scalar_is_empty() {
        assert!(parse_locations("42").is_empty());
        assert!(parse_locations(r#""Jakarta""#).is_empty());
    }

    #[test]
    fn test_parse_malformed_json_is_empty() {
        assert!(parse_locations("Sure! Here are the locations: [").is_empty());
        assert!(parse_locations("").is_empty());
    }

    #[test]
    fn test_parse_missing_fields_is_empty() {
        let raw = r#"[{"name":"Jakarta","type":"city","confidence":0.95,"summary":"ok"},{"name":"Bandung"}]"#;
        assert!(parse_locations(raw).is_empty());
    }

    #[test]
    fn test_prompt_embeds_article_and_guidance() {
        let prompt = build_prompt("Floods hit Jakarta.");
        assert!(prompt.ends_with("Floods hit Jakarta."));
        assert!(prompt.contains("0.9 to 1.0"));
        assert!(prompt.contains("0.6 to 0.89"));
        assert!(prompt.contains("0.3 to 0.59"));
        assert!(prompt.contains("below 0.3"));
        assert!(prompt.contains("Do not wrap the output in ```json"));
        assert!(prompt.contains("40 words"));
    }

    #[test]
    fn test_filter_keeps_boundary_value() {
        let mentions = vec![mention("A", 0.90), mention("B", 0.8999), mention("C", 1.0)];
        let kept = filter_confident(&mentions, 0.90);
        let names: Vec<&str> = kept.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_filter_drops_everything_below_threshold() {
        let mentions = vec![mention("A", 0.1), mention("B", 0.89)];
        assert!(filter_confident(&mentions, 0.90).is_empty());
    }

    #[test]
    fn test_filter_preserves_order_and_duplicates() {
        let mentions = vec![mention("Paris", 0.95), mention("Lyon", 0.99), mention("Paris", 0.92)];
        let kept = filter_confident(&mentions, 0.90);
        assert_eq!(kept, mentions);
    }

    #[tokio::test]
    async fn test_extract_makes_one_call_with_prompt() {
        let asker = CannedAsk::new(JAKARTA_BANDUNG);
        let mentions = extract_locations(&asker, "Floods hit Jakarta and Bandung yesterday.").await;

        assert_eq!(mentions.len(), 2);
        let prompts = asker.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Floods hit Jakarta and Bandung yesterday."));
    }

    #[tokio::test]
    async fn test_extract_backend_failure_is_empty() {
        let asker = CannedAsk {
            reply: Err("HTTP 503".to_string()),
            prompts: Mutex::new(Vec::new()),
        };
        assert!(extract_locations(&asker, "Some article").await.is_empty());
    }
}
