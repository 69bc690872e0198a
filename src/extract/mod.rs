//! Field extraction from the rendered tracker page.
//!
//! The page structure is neither stable nor documented, so extraction works
//! on flattened text: one pass for the route around the "Flight Status"
//! heading, then one pass over every `div` applying the rule table in
//! `rules`. Extraction never fails; unrecoverable fields stay empty.

pub mod route;
pub mod rules;

use chrono::NaiveDate;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use tracing::debug;

use crate::core::config::DEFAULT_AIRLINE_DISPLAY_NAMES;
use crate::core::types::{FlightRecord, LookupKey};

static DIV_SELECTOR: OnceLock<Selector> = OnceLock::new();

pub(crate) fn div_selector() -> &'static Selector {
    DIV_SELECTOR.get_or_init(|| Selector::parse("div").expect("valid selector"))
}

/// Extractor configured with the airline display names to ignore as cities.
#[derive(Debug, Clone)]
pub struct Extractor {
    airline_display_names: Vec<String>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(
            DEFAULT_AIRLINE_DISPLAY_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

impl Extractor {
    pub fn new(airline_display_names: Vec<String>) -> Self {
        Self {
            airline_display_names,
        }
    }

    pub fn extract(&self, markup: &str, key: &LookupKey) -> FlightRecord {
        let doc = Html::parse_document(markup);
        let mut record = FlightRecord::empty(key);

        let mut noise: Vec<&str> = vec![key.airline_code.as_str(), key.flight_number.as_str()];
        noise.extend(self.airline_display_names.iter().map(String::as_str));
        if let Some((origin, destination)) = route::extract_route(&doc, &noise) {
            record.origin = origin;
            record.destination = destination;
        }

        for div in doc.select(div_selector()) {
            let text = div.text().collect::<String>();
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            rules::scan_block(text, &mut record);
        }

        debug!(
            "extracted {}: origin='{}' destination='{}' status='{}' duration='{}'",
            key, record.origin, record.destination, record.status, record.duration
        );
        record
    }
}

/// Extract with the default airline display names.
pub fn extract(
    markup: &str,
    airline_code: &str,
    flight_number: &str,
    departure_date: NaiveDate,
) -> FlightRecord {
    Extractor::default().extract(
        markup,
        &LookupKey::new(airline_code, flight_number, departure_date),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn times_and_duration_from_nested_blocks() {
        let html = r#"<html><body>
            <div class="times">
                <div><div>Scheduled</div><div>09:15 WIB</div></div>
                <div><div>Actual</div><div>09:40 WIB</div></div>
            </div>
            <div><div>Flight Time</div><div>Total 2h 5m</div></div>
        </body></html>"#;
        let rec = extract(html, "MH", "716", date());
        assert_eq!(rec.scheduled_departure_time, "09:15 WIB");
        assert_eq!(rec.actual_departure_time, "09:40 WIB");
        assert_eq!(rec.duration, "2h 5m");
        assert_eq!(rec.origin, "");
        assert_eq!(rec.destination, "");
        assert_eq!(rec.airline_code, "MH");
        assert_eq!(rec.departure_date, date());
    }

    #[test]
    fn blank_page_yields_fully_shaped_empty_record() {
        let rec = extract("<html><body></body></html>", "MH", "716", date());
        assert!(!rec.has_flight_data());
        assert_eq!(rec.id, None);
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = r#"<div><div>Flight Status</div><div>CGK</div><div>Jakarta</div>
            <div>KUL</div><div>Kuala Lumpur</div><div>Arrived Delayed by 7 minutes</div></div>"#;
        let a = extract(html, "MH", "716", date());
        let b = extract(html, "MH", "716", date());
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn configured_display_names_are_not_cities() {
        let html = r#"<div><div>Flight Status</div><div>AirAsia</div>
            <div>CGK</div><div>Jakarta</div><div>KUL</div><div>Kuala Lumpur</div></div>"#;
        let key = LookupKey::new("AK", "381", date());
        let rec = Extractor::new(vec!["AirAsia".into()]).extract(html, &key);
        assert_eq!(rec.origin, "Jakarta (CGK)");
        assert_eq!(rec.destination, "Kuala Lumpur (KUL)");
    }
}
