//! Direct time resolution: city aliases, IANA zone names and multi-zone countries.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Display format for a single reading, e.g. `09:00 PM JST`.
pub const TIME_FORMAT: &str = "%I:%M %p %Z";

const CITY_ALIASES: &[(&str, Tz)] = &[
    ("nyc", Tz::America__New_York),
    ("new york", Tz::America__New_York),
    ("new york city", Tz::America__New_York),
    ("la", Tz::America__Los_Angeles),
    ("los angeles", Tz::America__Los_Angeles),
    ("san francisco", Tz::America__Los_Angeles),
    ("sf", Tz::America__Los_Angeles),
    ("seattle", Tz::America__Los_Angeles),
    ("chicago", Tz::America__Chicago),
    ("denver", Tz::America__Denver),
    ("toronto", Tz::America__Toronto),
    ("mexico city", Tz::America__Mexico_City),
    ("sao paulo", Tz::America__Sao_Paulo),
    ("london", Tz::Europe__London),
    ("paris", Tz::Europe__Paris),
    ("berlin", Tz::Europe__Berlin),
    ("madrid", Tz::Europe__Madrid),
    ("rome", Tz::Europe__Rome),
    ("amsterdam", Tz::Europe__Amsterdam),
    ("moscow", Tz::Europe__Moscow),
    ("istanbul", Tz::Europe__Istanbul),
    ("cairo", Tz::Africa__Cairo),
    ("nairobi", Tz::Africa__Nairobi),
    ("dubai", Tz::Asia__Dubai),
    ("mumbai", Tz::Asia__Kolkata),
    ("delhi", Tz::Asia__Kolkata),
    ("new delhi", Tz::Asia__Kolkata),
    ("bangalore", Tz::Asia__Kolkata),
    ("singapore", Tz::Asia__Singapore),
    ("hong kong", Tz::Asia__Hong_Kong),
    ("shanghai", Tz::Asia__Shanghai),
    ("beijing", Tz::Asia__Shanghai),
    ("seoul", Tz::Asia__Seoul),
    ("tokyo", Tz::Asia__Tokyo),
    ("sydney", Tz::Australia__Sydney),
    ("melbourne", Tz::Australia__Melbourne),
    ("auckland", Tz::Pacific__Auckland),
    ("utc", Tz::UTC),
    ("gmt", Tz::UTC),
];

const US_ZONES: &[(&str, Tz)] = &[
    ("New York", Tz::America__New_York),
    ("Chicago", Tz::America__Chicago),
    ("Denver", Tz::America__Denver),
    ("Los Angeles", Tz::America__Los_Angeles),
];
const INDIA_ZONES: &[(&str, Tz)] = &[("New Delhi", Tz::Asia__Kolkata)];
const CHINA_ZONES: &[(&str, Tz)] = &[("Beijing", Tz::Asia__Shanghai)];
const RUSSIA_ZONES: &[(&str, Tz)] = &[
    ("Moscow", Tz::Europe__Moscow),
    ("Yekaterinburg", Tz::Asia__Yekaterinburg),
    ("Novosibirsk", Tz::Asia__Novosibirsk),
    ("Vladivostok", Tz::Asia__Vladivostok),
];
const AUSTRALIA_ZONES: &[(&str, Tz)] = &[
    ("Sydney", Tz::Australia__Sydney),
    ("Adelaide", Tz::Australia__Adelaide),
    ("Perth", Tz::Australia__Perth),
];
const UK_ZONES: &[(&str, Tz)] = &[("London", Tz::Europe__London)];

const COUNTRY_ALIASES: &[(&str, &str, &[(&str, Tz)])] = &[
    ("us", "United States", US_ZONES),
    ("usa", "United States", US_ZONES),
    ("united states", "United States", US_ZONES),
    ("america", "United States", US_ZONES),
    ("india", "India", INDIA_ZONES),
    ("china", "China", CHINA_ZONES),
    ("russia", "Russia", RUSSIA_ZONES),
    ("australia", "Australia", AUSTRALIA_ZONES),
    ("uk", "United Kingdom", UK_ZONES),
    ("united kingdom", "United Kingdom", UK_ZONES),
    ("britain", "United Kingdom", UK_ZONES),
    ("england", "United Kingdom", UK_ZONES),
];

/// What a place name resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeResolution {
    Zone { label: String, tz: Tz },
    Country { label: String, zones: Vec<(String, Tz)> },
}

impl TimeResolution {
    /// Human reading at `now`: one line for a zone, `• City: time` lines for a country.
    pub fn render(&self, now: DateTime<Utc>) -> String {
        match self {
            TimeResolution::Zone { label, tz } => {
                format!("The time in {} is {}", label, format_reading(now, *tz))
            }
            TimeResolution::Country { label, zones } => {
                let lines = zones
                    .iter()
                    .map(|(city, tz)| format!("• {}: {}", city, format_reading(now, *tz)))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("Current times in {}:\n{}", label, lines)
            }
        }
    }

    pub fn to_json(&self, now: DateTime<Utc>) -> serde_json::Value {
        match self {
            TimeResolution::Zone { label, tz } => serde_json::json!({
                "location": label,
                "timezone": tz.name(),
                "time": format_reading(now, *tz),
            }),
            TimeResolution::Country { label, zones } => serde_json::json!({
                "location": label,
                "zones": zones
                    .iter()
                    .map(|(city, tz)| serde_json::json!({
                        "city": city,
                        "timezone": tz.name(),
                        "time": format_reading(now, *tz),
                    }))
                    .collect::<Vec<_>>(),
            }),
        }
    }
}

pub fn format_reading(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format(TIME_FORMAT).to_string()
}

fn normalize(place: &str) -> String {
    place
        .trim()
        .trim_matches(|c: char| matches!(c, '.' | ',' | '?' | '!'))
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn title_case(place: &str) -> String {
    place
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a place without any network call. `None` when the place is unknown.
pub fn resolve(place: &str) -> Option<TimeResolution> {
    let key = normalize(place);
    if key.is_empty() {
        return None;
    }
    if let Some((_, label, zones)) = COUNTRY_ALIASES.iter().find(|(alias, _, _)| *alias == key) {
        return Some(TimeResolution::Country {
            label: (*label).to_string(),
            zones: zones.iter().map(|(c, tz)| ((*c).to_string(), *tz)).collect(),
        });
    }
    if let Some((_, tz)) = CITY_ALIASES.iter().find(|(alias, _)| *alias == key) {
        let label = if key.len() <= 3 {
            tz.name().rsplit('/').next().unwrap_or(tz.name()).replace('_', " ")
        } else {
            title_case(&key)
        };
        return Some(TimeResolution::Zone { label, tz: *tz });
    }
    let iana = place.trim().replace(' ', "_");
    Tz::from_str_insensitive(&iana)
        .ok()
        .map(|tz| TimeResolution::Zone {
            label: tz.name().to_string(),
            tz,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn city_alias_resolves() {
        let r = resolve("Tokyo").unwrap();
        assert_eq!(
            r,
            TimeResolution::Zone {
                label: "Tokyo".into(),
                tz: Tz::Asia__Tokyo
            }
        );
        assert_eq!(r.render(noon_utc()), "The time in Tokyo is 09:00 PM JST");
    }

    #[test]
    fn short_alias_uses_zone_city() {
        let r = resolve("NYC").unwrap();
        assert_eq!(r.render(noon_utc()), "The time in New York is 07:00 AM EST");
    }

    #[test]
    fn iana_names_are_case_insensitive() {
        let r = resolve("europe/lisbon").unwrap();
        assert!(matches!(r, TimeResolution::Zone { tz: Tz::Europe__Lisbon, .. }));
    }

    #[test]
    fn country_lists_every_zone() {
        let text = resolve("US").unwrap().render(noon_utc());
        assert!(text.starts_with("Current times in United States:"));
        assert!(text.contains("• New York: 07:00 AM EST"));
        assert!(text.contains("• Los Angeles: 04:00 AM PST"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn unknown_place_is_none() {
        assert!(resolve("Springfield").is_none());
        assert!(resolve("   ").is_none());
    }
}
