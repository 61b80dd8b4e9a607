//! Turns provider payloads into a spoken sentence plus normalized data.

use chrono::{DateTime, Utc};
use herald_core::{CollaboratorError, Details, RealTimeCategory, SearchHit};
use serde_json::{json, Value};

use super::timezones;

/// Articles shown for a news answer.
pub const NEWS_ARTICLES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Formatted {
    pub message: String,
    pub data: Value,
}

fn text(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match v.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn malformed(category: RealTimeCategory, what: &str) -> CollaboratorError {
    CollaboratorError::Malformed(format!("{category} payload missing {what}"))
}

/// Formats `payload` for `category`. A payload without the essentials is `Malformed`, so the
/// cascade moves on instead of speaking an empty answer.
pub fn format_payload(
    category: RealTimeCategory,
    params: &Details,
    payload: &Value,
    now: DateTime<Utc>,
) -> Result<Formatted, CollaboratorError> {
    match category {
        RealTimeCategory::Weather => weather(params, payload),
        RealTimeCategory::Time => time(params, payload, now),
        RealTimeCategory::News => news(params, payload),
        RealTimeCategory::Stocks => stocks(params, payload),
        RealTimeCategory::Sports => sports(params, payload),
        RealTimeCategory::Flights => flights(params, payload),
    }
}

fn weather(params: &Details, v: &Value) -> Result<Formatted, CollaboratorError> {
    let location = text(v, &["location", "name"])
        .or_else(|| params.get("location").cloned())
        .unwrap_or_default();
    let temperature = v
        .get("temperature")
        .or_else(|| v.get("temp"))
        .filter(|t| !t.is_null())
        .cloned()
        .ok_or_else(|| malformed(RealTimeCategory::Weather, "temperature"))?;
    let conditions = text(v, &["conditions", "description", "summary"])
        .ok_or_else(|| malformed(RealTimeCategory::Weather, "conditions"))?;

    let temp_text = match &temperature {
        Value::Number(n) => format!("{n}°"),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mut data = json!({
        "location": location,
        "temperature": temperature,
        "conditions": conditions,
    });
    for extra in ["humidity", "wind_speed", "feels_like"] {
        if let Some(x) = v.get(extra).filter(|x| !x.is_null()) {
            data[extra] = x.clone();
        }
    }
    Ok(Formatted {
        message: format!("Weather in {location}: {temp_text}, {conditions}"),
        data,
    })
}

/// Geocoding+time providers answer with an IANA `timezone` or a preformatted `time`.
fn time(params: &Details, v: &Value, now: DateTime<Utc>) -> Result<Formatted, CollaboratorError> {
    let location = text(v, &["location", "name"])
        .or_else(|| params.get("location").cloned())
        .unwrap_or_default();
    if let Some(zone) = text(v, &["timezone", "tz"]) {
        if let Ok(tz) = chrono_tz::Tz::from_str_insensitive(&zone) {
            let reading = timezones::format_reading(now, tz);
            return Ok(Formatted {
                message: format!("The time in {location} is {reading}"),
                data: json!({ "location": location, "timezone": tz.name(), "time": reading }),
            });
        }
    }
    let reading = text(v, &["time", "datetime", "local_time"])
        .ok_or_else(|| malformed(RealTimeCategory::Time, "timezone or time"))?;
    Ok(Formatted {
        message: format!("The time in {location} is {reading}"),
        data: json!({ "location": location, "time": reading }),
    })
}

fn news(params: &Details, v: &Value) -> Result<Formatted, CollaboratorError> {
    let articles = v
        .get("articles")
        .and_then(Value::as_array)
        .or_else(|| v.as_array())
        .ok_or_else(|| malformed(RealTimeCategory::News, "articles"))?;
    let top: Vec<Value> = articles
        .iter()
        .filter_map(|a| {
            let title = text(a, &["title"])?;
            let source = a
                .get("source")
                .and_then(|s| text(s, &["name"]).or_else(|| s.as_str().map(str::to_string)))
                .unwrap_or_else(|| "unknown source".to_string());
            let url = text(a, &["url", "link"]).unwrap_or_default();
            Some(json!({ "title": title, "source": source, "url": url }))
        })
        .take(NEWS_ARTICLES)
        .collect();
    if top.is_empty() {
        return Err(malformed(RealTimeCategory::News, "articles"));
    }
    let message = top
        .iter()
        .map(|a| {
            format!(
                "📰 {} ({})\n{}",
                a["title"].as_str().unwrap_or_default(),
                a["source"].as_str().unwrap_or_default(),
                a["url"].as_str().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    let topic = params.get("topic").cloned().unwrap_or_default();
    Ok(Formatted {
        message,
        data: json!({ "topic": topic, "articles": top }),
    })
}

fn stocks(params: &Details, v: &Value) -> Result<Formatted, CollaboratorError> {
    let symbol = text(v, &["symbol"])
        .or_else(|| params.get("symbol").cloned())
        .unwrap_or_default()
        .to_uppercase();
    let price = v
        .get("price")
        .and_then(Value::as_f64)
        .ok_or_else(|| malformed(RealTimeCategory::Stocks, "price"))?;
    let change = v.get("change_percent").and_then(Value::as_f64);
    let message = match change {
        Some(pct) => format!("{symbol}: ${price:.2} ({pct:+.2}%)"),
        None => format!("{symbol}: ${price:.2}"),
    };
    Ok(Formatted {
        message,
        data: json!({ "symbol": symbol, "price": price, "change_percent": change }),
    })
}

fn sports(params: &Details, v: &Value) -> Result<Formatted, CollaboratorError> {
    let team = text(v, &["team"])
        .or_else(|| params.get("team").cloned())
        .unwrap_or_default();
    let message = match text(v, &["summary"]) {
        Some(summary) => summary,
        None => {
            let home = text(v, &["home"]).ok_or_else(|| malformed(RealTimeCategory::Sports, "teams"))?;
            let away = text(v, &["away"]).ok_or_else(|| malformed(RealTimeCategory::Sports, "teams"))?;
            let home_score = text(v, &["home_score"]).unwrap_or_else(|| "-".into());
            let away_score = text(v, &["away_score"]).unwrap_or_else(|| "-".into());
            match text(v, &["status"]) {
                Some(status) => format!("{home} {home_score} - {away_score} {away} ({status})"),
                None => format!("{home} {home_score} - {away_score} {away}"),
            }
        }
    };
    let mut data = v.clone();
    if data.is_object() {
        data["team"] = json!(team);
    }
    Ok(Formatted { message, data })
}

fn flights(params: &Details, v: &Value) -> Result<Formatted, CollaboratorError> {
    let number = text(v, &["number", "flight"])
        .or_else(|| params.get("number").cloned())
        .unwrap_or_default()
        .to_uppercase();
    let status = text(v, &["status"]).ok_or_else(|| malformed(RealTimeCategory::Flights, "status"))?;
    let route = match (text(v, &["departure", "from"]), text(v, &["arrival", "to"])) {
        (Some(dep), Some(arr)) => format!(" ({dep} → {arr})"),
        _ => String::new(),
    };
    Ok(Formatted {
        message: format!("Flight {number}: {status}{route}"),
        data: json!({
            "number": number,
            "status": status,
            "departure": text(v, &["departure", "from"]),
            "arrival": text(v, &["arrival", "to"]),
        }),
    })
}

/// Numbered title/url/snippet lines for web results.
pub fn web_results(query: &str, hits: &[SearchHit]) -> String {
    let mut out = format!("Here's what I found for \"{query}\":");
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("\n{}. {}\n   {}", i + 1, hit.title, hit.url));
        if !hit.snippet.trim().is_empty() {
            out.push_str(&format!("\n   {}", hit.snippet.trim()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(key: &str, value: &str) -> Details {
        let mut d = Details::new();
        d.insert(key.into(), value.into());
        d
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn weather_keeps_core_fields() {
        let f = format_payload(
            RealTimeCategory::Weather,
            &params("location", "Tokyo"),
            &json!({"temperature": 18, "conditions": "clear sky", "humidity": 40}),
            now(),
        )
        .unwrap();
        assert_eq!(f.message, "Weather in Tokyo: 18°, clear sky");
        assert_eq!(f.data["location"], "Tokyo");
        assert_eq!(f.data["temperature"], 18);
        assert_eq!(f.data["conditions"], "clear sky");
        assert_eq!(f.data["humidity"], 40);
    }

    #[test]
    fn weather_without_temperature_is_malformed() {
        let err = format_payload(
            RealTimeCategory::Weather,
            &params("location", "Tokyo"),
            &json!({"conditions": "rain"}),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, CollaboratorError::Malformed(_)));
    }

    #[test]
    fn news_shows_top_three() {
        let payload = json!({"articles": [
            {"title": "A", "source": {"name": "Wire"}, "url": "https://a"},
            {"title": "B", "source": "Daily", "url": "https://b"},
            {"title": "C", "url": "https://c"},
            {"title": "D", "url": "https://d"},
        ]});
        let f = format_payload(RealTimeCategory::News, &params("topic", "ai"), &payload, now()).unwrap();
        assert!(f.message.starts_with("📰 A (Wire)\nhttps://a"));
        assert!(f.message.contains("📰 C (unknown source)"));
        assert!(!f.message.contains("📰 D"));
        assert_eq!(f.data["articles"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn empty_news_is_malformed() {
        assert!(format_payload(RealTimeCategory::News, &Details::new(), &json!({"articles": []}), now()).is_err());
    }

    #[test]
    fn time_from_provider_zone() {
        let f = format_payload(
            RealTimeCategory::Time,
            &params("location", "Reykjavik"),
            &json!({"timezone": "Atlantic/Reykjavik"}),
            now(),
        )
        .unwrap();
        assert_eq!(f.message, "The time in Reykjavik is 12:00 PM GMT");
    }

    #[test]
    fn stocks_and_flights() {
        let f = format_payload(
            RealTimeCategory::Stocks,
            &params("symbol", "aapl"),
            &json!({"price": 189.5, "change_percent": 1.25}),
            now(),
        )
        .unwrap();
        assert_eq!(f.message, "AAPL: $189.50 (+1.25%)");

        let f = format_payload(
            RealTimeCategory::Flights,
            &params("number", "ua90"),
            &json!({"status": "delayed", "departure": "EWR", "arrival": "TLV"}),
            now(),
        )
        .unwrap();
        assert_eq!(f.message, "Flight UA90: delayed (EWR → TLV)");
    }

    #[test]
    fn web_results_are_numbered() {
        let hits = vec![
            SearchHit { title: "Rust".into(), url: "https://rust-lang.org".into(), snippet: "A language".into() },
            SearchHit { title: "Crates".into(), url: "https://crates.io".into(), snippet: String::new() },
        ];
        let text = web_results("rust", &hits);
        assert!(text.contains("1. Rust\n   https://rust-lang.org\n   A language"));
        assert!(text.ends_with("2. Crates\n   https://crates.io"));
    }
}
