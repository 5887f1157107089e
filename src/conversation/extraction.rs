//! Single-field slot extraction.
//!
//! Two interchangeable strategies fill one [`LeadField`] from one caller
//! message: [`AiExtractor`] asks the model for a one-key JSON object,
//! [`ManualExtractor`] applies keyword and pattern heuristics. The engine
//! picks the AI tier while it is enabled and falls back to the manual tier
//! whenever the AI tier does not produce a value.
//!
//! The manual heuristics accept any reply of three words or fewer for the
//! name, location and contact fields. That keeps short answers flowing but
//! also accepts replies like "not sure yet".

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::fields::{FieldValue, LeadField};
use crate::directory::parse_volume;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::templates;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap()
});

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

const HEALTH_KEYWORDS: &[&str] = &[
    "natural",
    "health",
    "care",
    "medical",
    "wellness",
    "supplements",
    "products",
];

const PLACE_KEYWORDS: &[&str] = &["city", "town", "street", "avenue", "road"];

const TITLE_KEYWORDS: &[&str] = &["manager", "owner", "director", "pharmacist"];

/// Replies of at most this many words are taken verbatim for free-text fields.
const SHORT_REPLY_WORDS: usize = 3;

/// Outcome of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A value that passed validation.
    Found(FieldValue),
    /// Something was extracted but failed validation.
    Rejected(String),
    /// Nothing usable in the message.
    NotFound,
    /// The strategy could not run (model error, timeout).
    Unavailable(String),
}

impl Extraction {
    pub fn value(self) -> Option<FieldValue> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Strategy for pulling one field out of one caller message.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(&self, field: LeadField, message: &str) -> Extraction;
}

// ── AI tier ─────────────────────────────────────────────────────────

/// Model-backed extraction. Deterministic settings, tiny replies.
pub struct AiExtractor {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
    temperature: f32,
}

impl AiExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            llm,
            max_tokens,
            temperature,
        }
    }
}

#[async_trait]
impl FieldExtractor for AiExtractor {
    fn name(&self) -> &'static str {
        "ai"
    }

    async fn extract(&self, field: LeadField, message: &str) -> Extraction {
        let prompt = templates::extraction_prompt(field, message);
        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)])
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%field, error = %e, "Extraction request failed");
                return Extraction::Unavailable(e.to_string());
            }
        };

        let object = parse_json_or_empty(&response.content);
        match object.get(field.key()) {
            None => {
                debug!(%field, raw = %response.content, "Model found no value");
                Extraction::NotFound
            }
            Some(raw) => match validate_field_value(field, raw) {
                Some(value) => Extraction::Found(value),
                None => {
                    warn!(%field, value = %raw, "Model returned an invalid value");
                    Extraction::Rejected(raw.to_string())
                }
            },
        }
    }
}

/// Parse a model reply into a JSON object, dropping null members.
///
/// Handles empty replies, code fences with or without a `json` tag, prose
/// around the object and malformed JSON. Anything unusable yields an empty
/// map.
pub fn parse_json_or_empty(raw: &str) -> Map<String, Value> {
    let candidate = extract_json_object(raw);
    if candidate.is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Value>(&candidate) {
        Ok(Value::Object(map)) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        Ok(other) => {
            debug!(kind = ?other, "Model reply was JSON but not an object");
            Map::new()
        }
        Err(e) => {
            debug!(error = %e, raw, "Model reply was not valid JSON");
            Map::new()
        }
    }
}

/// Cut the JSON object out of a reply that may be fenced or wrapped in prose.
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Bare object, possibly followed by a dangling closing fence
    if trimmed.starts_with('{') {
        let body = trimmed.strip_suffix("```").unwrap_or(trimmed);
        return body.trim_end().to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

/// Sanity-check a raw extracted value for `field`.
///
/// Volumes must coerce to a positive integer. Text fields must be non-blank
/// strings; numbers are stringified.
pub fn validate_field_value(field: LeadField, raw: &Value) -> Option<FieldValue> {
    match field {
        LeadField::RxVolume => parse_volume(raw)
            .filter(|v| *v > 0)
            .map(FieldValue::Volume),
        _ => {
            let text = match raw {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            (!text.is_empty()).then_some(FieldValue::Text(text))
        }
    }
}

// ── Manual tier ─────────────────────────────────────────────────────

/// Keyword and pattern heuristics. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualExtractor;

impl ManualExtractor {
    pub fn extract_now(&self, field: LeadField, message: &str) -> Option<FieldValue> {
        let words: Vec<&str> = message.split_whitespace().collect();
        let whole = message.trim();

        let value = match field {
            LeadField::PharmacyName => join_with_previous(&words, &["pharmacy"]).or_else(|| {
                let short = words.len() <= SHORT_REPLY_WORDS;
                let health = words
                    .iter()
                    .any(|w| HEALTH_KEYWORDS.contains(&w.to_lowercase().as_str()));
                (short || health).then(|| whole.to_string())
            }),
            LeadField::Location => {
                if words.len() <= SHORT_REPLY_WORDS {
                    Some(whole.to_string())
                } else {
                    join_with_previous(&words, PLACE_KEYWORDS)
                }
            }
            LeadField::RxVolume => {
                // First ASCII digit run that fits a positive u32
                return DIGITS_RE
                    .find_iter(message)
                    .find_map(|m| m.as_str().parse::<u32>().ok().filter(|v| *v > 0))
                    .map(FieldValue::Volume);
            }
            LeadField::ContactPerson => {
                if words.len() <= SHORT_REPLY_WORDS {
                    Some(whole.to_string())
                } else {
                    join_with_previous(&words, TITLE_KEYWORDS)
                }
            }
            LeadField::Email => find_email_address(message),
        };

        value
            .filter(|v| !v.trim().is_empty())
            .map(FieldValue::Text)
    }
}

#[async_trait]
impl FieldExtractor for ManualExtractor {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn extract(&self, field: LeadField, message: &str) -> Extraction {
        match self.extract_now(field, message) {
            Some(value) => Extraction::Found(value),
            None => Extraction::NotFound,
        }
    }
}

/// First email address appearing in `text`.
pub fn find_email_address(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}

/// First word containing one of `keywords`, joined with the word before it.
fn join_with_previous(words: &[&str], keywords: &[&str]) -> Option<String> {
    let i = words.iter().position(|w| {
        let lower = w.to_lowercase();
        keywords.iter().any(|k| lower.contains(k))
    })?;
    Some(match i {
        0 => words[0].to_string(),
        _ => format!("{} {}", words[i - 1], words[i]),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::{CompletionResponse, FinishReason};

    fn manual(field: LeadField, message: &str) -> Option<FieldValue> {
        ManualExtractor.extract_now(field, message)
    }

    fn text(s: &str) -> Option<FieldValue> {
        Some(FieldValue::Text(s.to_string()))
    }

    // ── parse-or-empty ──────────────────────────────────────────────

    #[test]
    fn parses_plain_object() {
        let map = parse_json_or_empty(r#"{"location": "Orlando"}"#);
        assert_eq!(map.get("location"), Some(&json!("Orlando")));
    }

    #[test]
    fn parses_fenced_object() {
        let tagged = parse_json_or_empty("```json\n{\"rx_volume\": 1000}\n```");
        assert_eq!(tagged.get("rx_volume"), Some(&json!(1000)));

        let untagged = parse_json_or_empty("```\n{\"email\": \"a@b.co\"}\n```");
        assert_eq!(untagged.get("email"), Some(&json!("a@b.co")));

        let closing_only = parse_json_or_empty("{\"location\": \"Tampa\"}\n```");
        assert_eq!(closing_only.get("location"), Some(&json!("Tampa")));
    }

    #[test]
    fn parses_object_inside_prose() {
        let map = parse_json_or_empty("Sure! Here you go: {\"pharmacy_name\": \"Acme\"} Hope that helps.");
        assert_eq!(map.get("pharmacy_name"), Some(&json!("Acme")));
    }

    #[test]
    fn unusable_replies_are_empty() {
        assert!(parse_json_or_empty("").is_empty());
        assert!(parse_json_or_empty("   ").is_empty());
        assert!(parse_json_or_empty("I could not find anything").is_empty());
        assert!(parse_json_or_empty("{\"location\": ").is_empty());
        assert!(parse_json_or_empty("[1, 2]").is_empty());
    }

    #[test]
    fn nulls_are_dropped() {
        let map = parse_json_or_empty(r#"{"email": null, "location": "Tampa"}"#);
        assert!(!map.contains_key("email"));
        assert_eq!(map.len(), 1);
    }

    // ── validation ──────────────────────────────────────────────────

    #[test]
    fn volume_validation() {
        let field = LeadField::RxVolume;
        assert_eq!(validate_field_value(field, &json!(1000)), Some(FieldValue::Volume(1000)));
        assert_eq!(validate_field_value(field, &json!("750")), Some(FieldValue::Volume(750)));
        assert_eq!(validate_field_value(field, &json!(0)), None);
        assert_eq!(validate_field_value(field, &json!(-5)), None);
        assert_eq!(validate_field_value(field, &json!("lots")), None);
        assert_eq!(validate_field_value(field, &json!(true)), None);
    }

    #[test]
    fn text_validation() {
        let field = LeadField::Location;
        assert_eq!(validate_field_value(field, &json!(" Orlando ")), text("Orlando"));
        assert_eq!(validate_field_value(field, &json!(90210)), text("90210"));
        assert_eq!(validate_field_value(field, &json!("")), None);
        assert_eq!(validate_field_value(field, &json!(["a"])), None);
    }

    // ── manual heuristics ───────────────────────────────────────────

    #[test]
    fn manual_pharmacy_name() {
        assert_eq!(
            manual(LeadField::PharmacyName, "We are Sunrise Pharmacy in town"),
            text("Sunrise Pharmacy")
        );
        assert_eq!(manual(LeadField::PharmacyName, "pharmacy plus"), text("pharmacy"));
        assert_eq!(manual(LeadField::PharmacyName, "Naturally"), text("Naturally"));
        assert_eq!(
            manual(LeadField::PharmacyName, "we sell natural remedies and vitamins"),
            text("we sell natural remedies and vitamins")
        );
        assert_eq!(manual(LeadField::PharmacyName, "I would rather not say that"), None);
    }

    #[test]
    fn manual_location() {
        assert_eq!(manual(LeadField::Location, "Orlando, Florida"), text("Orlando, Florida"));
        assert_eq!(
            manual(LeadField::Location, "we are located on Main Street downtown"),
            text("Main Street")
        );
        assert_eq!(manual(LeadField::Location, "somewhere out west I guess"), None);
    }

    #[test]
    fn manual_volume() {
        assert_eq!(
            manual(LeadField::RxVolume, "We process 1500 prescriptions"),
            Some(FieldValue::Volume(1500))
        );
        assert_eq!(manual(LeadField::RxVolume, "about 20 to 30 thousand"), Some(FieldValue::Volume(20)));
        assert_eq!(manual(LeadField::RxVolume, "a lot"), None);
        assert_eq!(manual(LeadField::RxVolume, "0"), None);
    }

    #[test]
    fn manual_volume_skips_unusable_digit_runs() {
        assert_eq!(
            manual(LeadField::RxVolume, "٣ stores and 1500 prescriptions"),
            Some(FieldValue::Volume(1500))
        );
        assert_eq!(
            manual(LeadField::RxVolume, "license 99999999999, about 700 a month"),
            Some(FieldValue::Volume(700))
        );
        assert_eq!(manual(LeadField::RxVolume, "٣٤٥"), None);
    }

    #[test]
    fn manual_contact() {
        assert_eq!(manual(LeadField::ContactPerson, "Sarah Johnson"), text("Sarah Johnson"));
        assert_eq!(
            manual(LeadField::ContactPerson, "you should talk to our store manager about it"),
            text("store manager")
        );
        assert_eq!(manual(LeadField::ContactPerson, "nobody here handles that stuff"), None);
    }

    #[test]
    fn manual_email() {
        assert_eq!(
            manual(LeadField::Email, "sure, it's john.doe@pharmacy.com thanks"),
            text("john.doe@pharmacy.com")
        );
        assert_eq!(manual(LeadField::Email, "I don't have one"), None);
    }

    #[test]
    fn manual_never_accepts_blank() {
        for field in LeadField::ORDER {
            assert_eq!(manual(field, "   "), None, "{field}");
            assert_eq!(manual(field, ""), None, "{field}");
        }
    }

    // ── AI tier ─────────────────────────────────────────────────────

    struct CannedLlm {
        reply: Result<String, ()>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl CannedLlm {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for CannedLlm {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            match &self.reply {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    input_tokens: 0,
                    output_tokens: 0,
                    finish_reason: FinishReason::Stop,
                    response_id: None,
                }),
                Err(()) => Err(LlmError::Timeout {
                    provider: "canned".into(),
                    timeout: std::time::Duration::from_secs(30),
                }),
            }
        }
    }

    #[tokio::test]
    async fn ai_found_uses_deterministic_settings() {
        let llm = CannedLlm::replying("```json\n{\"rx_volume\": 2000}\n```");
        let extractor = AiExtractor::new(llm.clone(), 100, 0.0);

        let result = extractor.extract(LeadField::RxVolume, "we do 2000 a month").await;
        assert_eq!(result, Extraction::Found(FieldValue::Volume(2000)));

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen[0].max_tokens, Some(100));
        assert_eq!(seen[0].temperature, Some(0.0));
        assert!(seen[0].messages[0].content.contains("we do 2000 a month"));
    }

    #[tokio::test]
    async fn ai_outcomes() {
        let rejected = AiExtractor::new(CannedLlm::replying(r#"{"rx_volume": -4}"#), 100, 0.0);
        assert!(matches!(
            rejected.extract(LeadField::RxVolume, "x").await,
            Extraction::Rejected(_)
        ));

        let null = AiExtractor::new(CannedLlm::replying(r#"{"email": null}"#), 100, 0.0);
        assert_eq!(null.extract(LeadField::Email, "x").await, Extraction::NotFound);

        let wrong_key = AiExtractor::new(CannedLlm::replying(r#"{"location": "Tampa"}"#), 100, 0.0);
        assert_eq!(wrong_key.extract(LeadField::Email, "x").await, Extraction::NotFound);

        let down = AiExtractor::new(CannedLlm::failing(), 100, 0.0);
        assert!(matches!(
            down.extract(LeadField::Email, "x").await,
            Extraction::Unavailable(_)
        ));
    }
}
