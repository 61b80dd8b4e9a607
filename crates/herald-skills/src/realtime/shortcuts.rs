//! Pattern shortcuts that build a [`RealTimeRequest`] straight from the utterance, before any
//! model call.

use herald_core::{Details, RealTimeCategory, RealTimeRequest};
use once_cell::sync::Lazy;
use regex::Regex;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("static shortcut pattern")
}

const PLACE: &str = r"([\p{L}\p{N}][\p{L}\p{N}\s,'/_.-]*)";

static TIME_IN: Lazy<Regex> =
    Lazy::new(|| pattern(&format!(r"(?i)\btime\b(?:\s+is\s+it)?(?:\s+right\s+now|\s+now)?\s+in\s+{PLACE}")));
static WEATHER_IN: Lazy<Regex> =
    Lazy::new(|| pattern(&format!(r"(?i)\b(?:weather|temperature|forecast)\b.*?\b(?:in|at|for)\s+{PLACE}")));
static NEWS_ABOUT: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\b(?:news|headlines)\s+(?:about|on|for|regarding)\s+([\p{L}\p{N}][\p{L}\p{N}\s'.&-]*)"));
static TICKER: Lazy<Regex> = Lazy::new(|| pattern(r"\$([A-Za-z]{1,5})\b"));
static STOCK_OF: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\bstock\s+(?:price|quote)\s+(?:of|for)\s+([A-Za-z.]{1,10})\b"));
static FLIGHT: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\bflight\s+([A-Za-z]{2}\s?\d{1,4})\b"));
static SCORE_OF: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\bscore\s+(?:of|for)\s+(?:the\s+)?([\p{L}\p{N}][\p{L}\p{N}\s'.-]*?)(?:\s+game)?\s*[?.!]*$"));
static DID_TEAM: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\bdid\s+(?:the\s+)?([\p{L}\p{N}][\p{L}\p{N}\s'.-]*?)\s+(?:win|lose|play)\b"));
static TRAILING_WHEN: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)\s+(?:(?:for|on)\s+)?(?:right now|now|today|tonight|tomorrow|(?:this|next) (?:morning|afternoon|evening|week|weekend))$")
});
static LEADING_WHEN: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:right now|now|today|tonight|tomorrow|(?:this|next) (?:morning|afternoon|evening|week|weekend))(?:\s+(?:in|at|for)\s+|\s*$)")
});

fn clean(raw: &str) -> String {
    let mut s = raw
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | '?' | '!' | ';'))
        .trim()
        .to_string();
    while let Some(m) = LEADING_WHEN.find(&s) {
        s = s[m.end()..].trim().to_string();
    }
    while let Some(m) = TRAILING_WHEN.find(&s) {
        s.truncate(m.start());
        s = s.trim_end_matches(|c: char| matches!(c, '.' | ',' | '?' | '!' | ';')).trim().to_string();
    }
    s
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| clean(m.as_str()))
        .filter(|s| !s.is_empty())
}

/// Builds a request from the utterance when a shortcut pattern applies.
pub fn parse(utterance: &str) -> Option<RealTimeRequest> {
    if let Some(place) = capture(&TIME_IN, utterance) {
        return Some(RealTimeRequest::new(RealTimeCategory::Time, place));
    }
    if let Some(place) = capture(&WEATHER_IN, utterance) {
        return Some(RealTimeRequest::new(RealTimeCategory::Weather, place));
    }
    if let Some(topic) = capture(&NEWS_ABOUT, utterance) {
        return Some(RealTimeRequest::new(RealTimeCategory::News, topic));
    }
    if let Some(symbol) = capture(&TICKER, utterance).or_else(|| capture(&STOCK_OF, utterance)) {
        return Some(RealTimeRequest::new(RealTimeCategory::Stocks, symbol.to_uppercase()));
    }
    if let Some(number) = capture(&FLIGHT, utterance) {
        let number: String = number.chars().filter(|c| !c.is_whitespace()).collect();
        return Some(RealTimeRequest::new(RealTimeCategory::Flights, number.to_uppercase()));
    }
    if let Some(team) = capture(&SCORE_OF, utterance).or_else(|| capture(&DID_TEAM, utterance)) {
        return Some(RealTimeRequest::new(RealTimeCategory::Sports, team));
    }
    None
}

/// Request from explicit task details: `category` plus either the category's own field or
/// `query` as the subject.
pub fn from_details(details: &Details) -> Option<RealTimeRequest> {
    let category = RealTimeCategory::from_label(details.get("category")?)?;
    let field = category.required_field();
    let subject = details
        .get(field)
        .or_else(|| details.get("query"))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())?;
    let mut request = RealTimeRequest::new(category, subject);
    for (k, v) in details {
        if k != "category" && k != "query" && k != field {
            request.params.insert(k.clone(), v.clone());
        }
    }
    Some(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(text: &str) -> Option<(RealTimeCategory, String)> {
        parse(text).map(|r| (r.category, r.subject().unwrap_or_default().to_string()))
    }

    #[test]
    fn time_and_weather_places() {
        assert_eq!(req("what time is it in Tokyo?"), Some((RealTimeCategory::Time, "Tokyo".into())));
        assert_eq!(
            req("current time in New York right now"),
            Some((RealTimeCategory::Time, "New York".into()))
        );
        assert_eq!(
            req("what's the weather like in Paris today"),
            Some((RealTimeCategory::Weather, "Paris".into()))
        );
        assert_eq!(
            req("weather for tomorrow in Paris"),
            Some((RealTimeCategory::Weather, "Paris".into()))
        );
        assert_eq!(
            req("what's the forecast for this weekend in Berlin"),
            Some((RealTimeCategory::Weather, "Berlin".into()))
        );
    }

    #[test]
    fn news_stocks_flights_sports() {
        assert_eq!(
            req("latest news about electric cars"),
            Some((RealTimeCategory::News, "electric cars".into()))
        );
        assert_eq!(req("how is $tsla doing"), Some((RealTimeCategory::Stocks, "TSLA".into())));
        assert_eq!(
            req("current stock price of msft"),
            Some((RealTimeCategory::Stocks, "MSFT".into()))
        );
        assert_eq!(req("status of flight ua 90"), Some((RealTimeCategory::Flights, "UA90".into())));
        assert_eq!(
            req("what's the score of the Lakers game?"),
            Some((RealTimeCategory::Sports, "Lakers".into()))
        );
        assert_eq!(req("did the Celtics win"), Some((RealTimeCategory::Sports, "Celtics".into())));
    }

    #[test]
    fn no_shortcut_for_open_questions() {
        assert!(parse("what's happening with the mars rover").is_none());
        assert!(parse("").is_none());
    }

    #[test]
    fn explicit_details_build_request() {
        let mut d = Details::new();
        d.insert("category".into(), "stocks".into());
        d.insert("query".into(), "NVDA".into());
        let r = from_details(&d).unwrap();
        assert_eq!(r.category, RealTimeCategory::Stocks);
        assert_eq!(r.subject(), Some("NVDA"));

        d.insert("category".into(), "horoscope".into());
        assert!(from_details(&d).is_none());
    }
}
