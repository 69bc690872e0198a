//! Cache-then-fetch flight lookup.
//!
//! `ParseDate → CacheCheck → Hit → return`
//! `                       → Miss → Acquire → AwaitReady → Extract → Persist → return`
//!
//! Concurrent misses for one key are coalesced onto a single fetch by the
//! in-memory cache, so only one browser session is driven per key. Every
//! failure surfaces as exactly one `LookupError`; nothing is retried.

use chrono::NaiveDate;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::core::config::ScoutConfig;
use crate::core::error::LookupError;
use crate::core::types::{FlightRecord, LookupKey};
use crate::extract::Extractor;
use crate::features::flight_store::FlightStore;
use crate::scraping::{PageSource, Readiness};

/// Parse a `YYYY-MM-DD` date. Anything else, including valid dates in other
/// layouts, is `BadInput`.
pub fn parse_departure_date(text: &str) -> Result<NaiveDate, LookupError> {
    let bad = || LookupError::BadInput("Invalid date format. Use YYYY-MM-DD.".to_string());
    let bytes = text.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(bad());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| bad())
}

pub fn parse_lookup_key(
    airline_code: &str,
    flight_number: &str,
    departure_date: &str,
) -> Result<LookupKey, LookupError> {
    let date = parse_departure_date(departure_date.trim())?;
    let airline_code = airline_code.trim();
    let flight_number = flight_number.trim();
    if airline_code.is_empty() || flight_number.is_empty() {
        return Err(LookupError::BadInput(
            "airline_code and flight_number are required".to_string(),
        ));
    }
    Ok(LookupKey::new(airline_code, flight_number, date))
}

pub struct FlightTracker {
    store: Arc<dyn FlightStore>,
    source: Arc<dyn PageSource>,
    extractor: Extractor,
    // Records are immutable facts: no TTL.
    cache: Cache<LookupKey, FlightRecord>,
    session_limit: Arc<Semaphore>,
    deadline: Duration,
}

impl std::fmt::Debug for FlightTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightTracker")
            .field("cached_records", &self.cache.entry_count())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl FlightTracker {
    pub fn new(
        store: Arc<dyn FlightStore>,
        source: Arc<dyn PageSource>,
        extractor: Extractor,
        deadline: Duration,
        max_sessions: usize,
    ) -> Self {
        Self {
            store,
            source,
            extractor,
            cache: Cache::builder().max_capacity(10_000).build(),
            session_limit: Arc::new(Semaphore::new(max_sessions.max(1))),
            deadline,
        }
    }

    pub fn from_config(
        config: &ScoutConfig,
        store: Arc<dyn FlightStore>,
        source: Arc<dyn PageSource>,
    ) -> Self {
        Self::new(
            store,
            source,
            Extractor::new(config.resolve_airline_display_names()),
            config.resolve_lookup_deadline(),
            config.resolve_max_browser_sessions(),
        )
    }

    /// Return the record for the flight, fetching and persisting it on a miss.
    pub async fn lookup(
        &self,
        airline_code: &str,
        flight_number: &str,
        departure_date: &str,
    ) -> Result<FlightRecord, LookupError> {
        let key = parse_lookup_key(airline_code, flight_number, departure_date)?;
        self.lookup_key(&key).await
    }

    pub async fn lookup_key(&self, key: &LookupKey) -> Result<FlightRecord, LookupError> {
        if let Some(hit) = self.cache.get(key).await {
            info!("⚡ Cache hit (memory): {}", key);
            return Ok(hit);
        }
        self.cache
            .try_get_with(key.clone(), self.resolve(key))
            .await
            .map_err(|e| (*e).clone())
    }

    async fn resolve(&self, key: &LookupKey) -> Result<FlightRecord, LookupError> {
        if let Some(stored) = self.store.find(key).map_err(storage_error)? {
            info!("⚡ Cache hit (store): {}", key);
            return Ok(stored);
        }

        info!("Cache miss for {}, fetching from source", key);
        let record = self.fetch(key).await?;
        let stored = self.store.insert(&record).map_err(storage_error)?;
        info!("💾 Stored {} (id {:?})", key, stored.id);
        Ok(stored)
    }

    async fn fetch(&self, key: &LookupKey) -> Result<FlightRecord, LookupError> {
        let _permit = self
            .session_limit
            .acquire()
            .await
            .map_err(|_| LookupError::UpstreamUnavailable("browser limiter closed".into()))?;

        let outcome = tokio::time::timeout(self.deadline, self.source.render(key))
            .await
            .map_err(|_| {
                warn!("Lookup deadline ({:?}) exceeded for {}", self.deadline, key);
                LookupError::UpstreamUnavailable(format!(
                    "lookup exceeded {}s deadline",
                    self.deadline.as_secs()
                ))
            })?
            .map_err(|e| {
                warn!("Error fetching data for {}: {:#}", key, e);
                LookupError::UpstreamUnavailable(format!("{:#}", e))
            })?;

        match outcome {
            Readiness::Ready(html) => {
                let record = self.extractor.extract(&html, key);
                if record.has_flight_data() {
                    Ok(record)
                } else {
                    warn!("Page for {} rendered but yielded no flight fields", key);
                    Err(LookupError::NotFound(format!(
                        "no flight data could be extracted for {}",
                        key
                    )))
                }
            }
            Readiness::TimedOut => Err(LookupError::NotFound(format!(
                "flight status page for {} never finished loading",
                key
            ))),
            Readiness::Blocked(reason) => Err(LookupError::NotFound(format!(
                "source blocked the request for {} ({})",
                key, reason
            ))),
        }
    }
}

fn storage_error(e: anyhow::Error) -> LookupError {
    warn!("Flight store error: {:#}", e);
    LookupError::Storage(format!("{:#}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_iso_dates() {
        assert_eq!(
            parse_departure_date("2024-01-15").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn rejects_other_layouts_and_impossible_dates() {
        for bad in ["15-01-2024", "2024/01/15", "2024-1-15", "2024-02-30", "", "yesterday"] {
            assert!(
                matches!(parse_departure_date(bad), Err(LookupError::BadInput(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn blank_identifiers_are_bad_input() {
        assert!(matches!(
            parse_lookup_key(" ", "716", "2024-01-15"),
            Err(LookupError::BadInput(_))
        ));
        let key = parse_lookup_key(" MH ", "716", "2024-01-15").unwrap();
        assert_eq!(key.airline_code, "MH");
    }
}
