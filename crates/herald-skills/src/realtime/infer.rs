//! Model-assisted categorization of an open real-time question.

use herald_core::classifier::{details_from_json, extract_json_object};
use herald_core::{RealTimeCategory, RealTimeRequest, StructuredClassifier};
use serde_json::Value;

fn build_prompt(query: &str) -> String {
    format!(
        r#"Categorize this real-time information request. Reply with ONLY a JSON object:
{{"category": "<weather|time|news|stocks|sports|flights>", "params": {{ ... }}}}

Required params per category:
- weather: {{"location": "<city>"}}
- time: {{"location": "<city or country>"}}
- news: {{"topic": "<topic>"}}
- stocks: {{"symbol": "<ticker>"}}
- sports: {{"team": "<team name>"}}
- flights: {{"number": "<flight number>"}}

If none fits, reply {{"category": "none"}}.

Request:
"{}"
"#,
        query
    )
}

/// Parses the model's answer. `None` for anything unusable: bad JSON, unknown category,
/// missing required field.
pub fn parse_inference(raw: &str) -> Option<RealTimeRequest> {
    let json = extract_json_object(raw)?;
    let value: Value = serde_json::from_str(json).ok()?;
    let category = RealTimeCategory::from_label(value.get("category")?.as_str()?)?;
    let mut params = value.get("params").map(details_from_json).unwrap_or_default();
    // Some models put the fields next to "category" instead of under "params".
    let field = category.required_field();
    if !params.contains_key(field) {
        if let Some(v) = value.get(field).and_then(Value::as_str).filter(|s| !s.trim().is_empty()) {
            params.insert(field.to_string(), v.trim().to_string());
        }
    }
    let request = RealTimeRequest { category, params };
    request.subject()?;
    Some(request)
}

/// Asks the structured classifier what `query` is about.
pub async fn infer_request(classifier: &dyn StructuredClassifier, query: &str) -> Option<RealTimeRequest> {
    match classifier.classify(&build_prompt(query)).await {
        Ok(raw) => {
            let parsed = parse_inference(&raw);
            if parsed.is_none() {
                tracing::debug!(target: "herald::realtime", response = %raw, "categorization unusable");
            }
            parsed
        }
        Err(e) => {
            tracing::warn!(target: "herald::realtime", error = %e, "categorization failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_params() {
        let r = parse_inference(r#"```json
{"category": "news", "params": {"topic": "mars rover"}}
```"#)
        .unwrap();
        assert_eq!(r.category, RealTimeCategory::News);
        assert_eq!(r.subject(), Some("mars rover"));
    }

    #[test]
    fn accepts_flat_fields() {
        let r = parse_inference(r#"{"category": "stocks", "symbol": "AAPL"}"#).unwrap();
        assert_eq!(r.subject(), Some("AAPL"));
    }

    #[test]
    fn rejects_missing_field_and_unknown_category() {
        assert!(parse_inference(r#"{"category": "weather", "params": {}}"#).is_none());
        assert!(parse_inference(r#"{"category": "none"}"#).is_none());
        assert!(parse_inference("it's about the weather").is_none());
    }
}
