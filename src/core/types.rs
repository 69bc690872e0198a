use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Natural key of one flight instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    pub airline_code: String,
    pub flight_number: String,
    pub departure_date: NaiveDate,
}

impl LookupKey {
    pub fn new(
        airline_code: impl Into<String>,
        flight_number: impl Into<String>,
        departure_date: NaiveDate,
    ) -> Self {
        Self {
            airline_code: airline_code.into(),
            flight_number: flight_number.into(),
            departure_date,
        }
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{} on {}",
            self.airline_code,
            self.flight_number,
            self.departure_date.format("%Y-%m-%d")
        )
    }
}

/// One tracked flight, as extracted from the rendered tracker page.
///
/// Every textual field is always present; anything the page did not yield
/// stays an empty string.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FlightRecord {
    /// Store row id; `None` until the record has been persisted.
    #[serde(default)]
    pub id: Option<i64>,
    pub airline_code: String,
    pub flight_number: String,
    pub departure_date: NaiveDate,
    /// `"City (CODE)"`
    pub origin: String,
    /// `"City (CODE)"`
    pub destination: String,
    pub scheduled_departure_time: String,
    pub actual_departure_time: String,
    pub scheduled_arrival_time: String,
    pub actual_arrival_time: String,
    pub status: String,
    pub duration: String,
    pub codeshare_airline: String,
    pub codeshare_flight_number: String,
    pub aircraft_code: String,
    pub aircraft_type: String,
}

impl FlightRecord {
    /// A fully shaped record with only the identity filled in.
    pub fn empty(key: &LookupKey) -> Self {
        Self {
            id: None,
            airline_code: key.airline_code.clone(),
            flight_number: key.flight_number.clone(),
            departure_date: key.departure_date,
            origin: String::new(),
            destination: String::new(),
            scheduled_departure_time: String::new(),
            actual_departure_time: String::new(),
            scheduled_arrival_time: String::new(),
            actual_arrival_time: String::new(),
            status: String::new(),
            duration: String::new(),
            codeshare_airline: String::new(),
            codeshare_flight_number: String::new(),
            aircraft_code: String::new(),
            aircraft_type: String::new(),
        }
    }

    pub fn key(&self) -> LookupKey {
        LookupKey::new(
            self.airline_code.clone(),
            self.flight_number.clone(),
            self.departure_date,
        )
    }

    /// True when the page yielded at least one field beyond the identity.
    pub fn has_flight_data(&self) -> bool {
        [
            &self.origin,
            &self.destination,
            &self.scheduled_departure_time,
            &self.actual_departure_time,
            &self.scheduled_arrival_time,
            &self.actual_arrival_time,
            &self.status,
            &self.duration,
            &self.codeshare_airline,
            &self.codeshare_flight_number,
            &self.aircraft_code,
            &self.aircraft_type,
        ]
        .iter()
        .any(|v| !v.is_empty())
    }
}

/// Query string of `GET /track-flight/flight`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FlightQuery {
    pub airline_code: String,
    pub flight_number: String,
    pub departure_date: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> LookupKey {
        LookupKey::new("MH", "716", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
    }

    #[test]
    fn empty_record_has_no_flight_data() {
        let rec = FlightRecord::empty(&key());
        assert!(!rec.has_flight_data());
        assert_eq!(rec.key(), key());
    }

    #[test]
    fn any_field_counts_as_flight_data() {
        let mut rec = FlightRecord::empty(&key());
        rec.duration = "2h 5m".into();
        assert!(rec.has_flight_data());
    }

    #[test]
    fn departure_date_serializes_as_calendar_date() {
        let rec = FlightRecord::empty(&key());
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["departure_date"], "2024-01-15");
        assert_eq!(json["origin"], "");
    }

    #[test]
    fn key_display_is_human_readable() {
        assert_eq!(key().to_string(), "MH716 on 2024-01-15");
    }
}
