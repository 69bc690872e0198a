//! Trigger-then-pattern field rules.
//!
//! Each rule pairs cheap lower-case substring triggers with a regex that is
//! only run on blocks carrying every trigger. Rules never fail: a block that
//! triggers but does not match leaves the record untouched. When several
//! blocks match the same rule, the last one in document order wins.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::core::types::FlightRecord;

pub struct Rule {
    pub name: &'static str,
    pub triggers: &'static [&'static str],
    pattern: Regex,
    apply: fn(&Captures<'_>, &mut FlightRecord),
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("triggers", &self.triggers)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

impl Rule {
    fn new(
        name: &'static str,
        triggers: &'static [&'static str],
        pattern: &str,
        apply: fn(&Captures<'_>, &mut FlightRecord),
    ) -> Self {
        Self {
            name,
            triggers,
            pattern: Regex::new(pattern).expect("valid rule pattern"),
            apply,
        }
    }

    /// `lower` must be the lower-cased form of the block text.
    pub fn triggered_by(&self, lower: &str) -> bool {
        self.triggers.iter().all(|t| lower.contains(t))
    }

    /// Run the rule on one block. Returns `true` when a field was written.
    pub fn apply(&self, text: &str, lower: &str, record: &mut FlightRecord) -> bool {
        if !self.triggered_by(lower) {
            return false;
        }
        match self.pattern.captures(text) {
            Some(caps) => {
                (self.apply)(&caps, record);
                true
            }
            None => false,
        }
    }
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str().trim())
}

static RULES: OnceLock<Vec<Rule>> = OnceLock::new();

/// The ordered rule table.
pub fn rules() -> &'static [Rule] {
    RULES.get_or_init(|| {
        vec![
            Rule::new(
                "status",
                &["arrived", "delayed by"],
                r"(?i)Arrived\s*Delayed by\s*([\w\s]+)",
                |c, r| r.status = format!("Arrived, Delayed by {}", group(c, 1)),
            ),
            Rule::new(
                "scheduled_departure",
                &["scheduled", "wib"],
                r"Scheduled\s*(\d{2}:\d{2}\s*WIB)",
                |c, r| r.scheduled_departure_time = group(c, 1).to_string(),
            ),
            Rule::new(
                "actual_departure",
                &["actual", "wib"],
                r"Actual\s*(\d{2}:\d{2}\s*WIB)",
                |c, r| r.actual_departure_time = group(c, 1).to_string(),
            ),
            Rule::new(
                "scheduled_arrival",
                &["scheduled", "+08"],
                r"Scheduled\s*(\d{2}:\d{2}\s*\+08)",
                |c, r| r.scheduled_arrival_time = group(c, 1).to_string(),
            ),
            Rule::new(
                "actual_arrival",
                &["actual", "+08"],
                r"Actual\s*(\d{2}:\d{2}\s*\+08)",
                |c, r| r.actual_arrival_time = group(c, 1).to_string(),
            ),
            Rule::new(
                "duration",
                &["flight time", "total"],
                r"Total\s*(\d+h\s*\d+m)",
                |c, r| r.duration = group(c, 1).to_string(),
            ),
            Rule::new(
                "codeshare",
                &["codeshare airline"],
                r"(?i)Codeshare Airline\s*([\w\s]+)\s*Flight Number\s*\((\w+)\)\s*(\d+)",
                |c, r| {
                    r.codeshare_airline = group(c, 1).to_string();
                    r.codeshare_flight_number = group(c, 3).to_string();
                },
            ),
            Rule::new(
                "aircraft_code",
                &["aircraft equipment", "code"],
                r"Code\s*(\w{3})",
                |c, r| r.aircraft_code = group(c, 1).to_string(),
            ),
            Rule::new(
                "aircraft_type",
                &["aircraft equipment", "description"],
                r"(?i)Description\s*((?:Boeing|Airbus|Embraer|ATR|Bombardier)\s[\w\s()/-]+)",
                |c, r| r.aircraft_type = group(c, 1).to_string(),
            ),
        ]
    })
}

/// Apply every rule to one text block.
pub fn scan_block(text: &str, record: &mut FlightRecord) {
    let lower = text.to_lowercase();
    for rule in rules() {
        rule.apply(text, &lower, record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::LookupKey;
    use chrono::NaiveDate;

    fn blank() -> FlightRecord {
        FlightRecord::empty(&LookupKey::new(
            "MH",
            "716",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        ))
    }

    fn scanned(text: &str) -> FlightRecord {
        let mut rec = blank();
        scan_block(text, &mut rec);
        rec
    }

    fn rule(name: &str) -> &'static Rule {
        rules().iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn rule_names_are_unique() {
        let mut names: Vec<_> = rules().iter().map(|r| r.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), rules().len());
    }

    #[test]
    fn status_composes_delay_descriptor() {
        let rec = scanned("Arrived Delayed by 12 minutes");
        assert_eq!(rec.status, "Arrived, Delayed by 12 minutes");
    }

    #[test]
    fn status_needs_both_triggers() {
        assert_eq!(scanned("Arrived On time").status, "");
    }

    #[test]
    fn departure_times_use_wib() {
        let rec = scanned("Scheduled 09:15 WIB");
        assert_eq!(rec.scheduled_departure_time, "09:15 WIB");
        let rec = scanned("Actual 09:40 WIB");
        assert_eq!(rec.actual_departure_time, "09:40 WIB");
        assert_eq!(rec.scheduled_departure_time, "");
    }

    #[test]
    fn arrival_times_use_plus_eight() {
        let rec = scanned("Scheduled12:30 +08");
        assert_eq!(rec.scheduled_arrival_time, "12:30 +08");
        let rec = scanned("Actual 12:41 +08");
        assert_eq!(rec.actual_arrival_time, "12:41 +08");
        assert_eq!(rec.actual_departure_time, "");
    }

    #[test]
    fn duration_from_flight_time_block() {
        assert_eq!(scanned("Flight Time Total 2h 5m").duration, "2h 5m");
        assert_eq!(scanned("Total 2h 5m").duration, "");
    }

    #[test]
    fn codeshare_sentence_yields_name_and_number() {
        let rec = scanned("Codeshare Airline Qatar Airways Flight Number (QR) 5291");
        assert_eq!(rec.codeshare_airline, "Qatar Airways");
        assert_eq!(rec.codeshare_flight_number, "5291");
    }

    #[test]
    fn aircraft_code_and_description() {
        let rec = scanned("Aircraft Equipment Code 738 Description Boeing 737-800 (Winglets)");
        assert_eq!(rec.aircraft_code, "738");
        assert_eq!(rec.aircraft_type, "Boeing 737-800 (Winglets)");
    }

    #[test]
    fn description_requires_manufacturer_prefix() {
        let rec = scanned("Aircraft Equipment Description Unknown type");
        assert_eq!(rec.aircraft_type, "");
    }

    #[test]
    fn triggered_rule_without_match_leaves_field() {
        let mut rec = blank();
        rec.duration = "1h 0m".into();
        let lower = "flight time total unknown";
        assert!(!rule("duration").apply("Flight Time Total unknown", lower, &mut rec));
        assert_eq!(rec.duration, "1h 0m");
    }

    #[test]
    fn later_block_overwrites_earlier_match() {
        let mut rec = blank();
        scan_block("Scheduled 09:15 WIB", &mut rec);
        scan_block("Scheduled 09:20 WIB", &mut rec);
        assert_eq!(rec.scheduled_departure_time, "09:20 WIB");
    }
}
