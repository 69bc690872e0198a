use anyhow::Result;
use std::sync::Arc;

use crate::core::config::ScoutConfig;
use crate::features::flight_store::{FlightStore, SqliteFlightStore};
use crate::scraping::readiness::ReadyOptions;
use crate::scraping::source::{ChromiumPageSource, PageSource};
use crate::tools::lookup::FlightTracker;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<FlightTracker>,
    /// File-based config loaded from `flight-scout.json` (env-var fallback for all fields).
    pub config: Arc<ScoutConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tracker", &self.tracker)
            .field("source_host", &self.config.resolve_source_host())
            .finish()
    }
}

impl AppState {
    /// Production wiring: SQLite store on disk and headless Chromium.
    pub fn new(config: ScoutConfig) -> Result<Self> {
        let store: Arc<dyn FlightStore> =
            Arc::new(SqliteFlightStore::open(&config.resolve_database_path())?);
        let ready = ReadyOptions {
            timeout: config.resolve_ready_timeout(),
            poll_interval: config.resolve_ready_poll_interval(),
            snapshot_path: config.resolve_snapshot_path(),
        };
        let source: Arc<dyn PageSource> =
            Arc::new(ChromiumPageSource::new(config.resolve_source_host(), ready));
        Ok(Self::with_parts(config, store, source))
    }

    /// Wire the tracker over caller-supplied store and page source.
    pub fn with_parts(
        config: ScoutConfig,
        store: Arc<dyn FlightStore>,
        source: Arc<dyn PageSource>,
    ) -> Self {
        let tracker = Arc::new(FlightTracker::from_config(&config, store, source));
        Self {
            tracker,
            config: Arc::new(config),
        }
    }
}
