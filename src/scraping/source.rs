use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::browser_manager::BrowserSession;
use super::readiness::{await_ready, flight_tracker_url, ReadyOptions, Readiness};
use crate::core::types::LookupKey;

/// Produces the rendered tracker page for one flight.
///
/// The orchestrator talks to this seam only, so lookups can be exercised
/// without a browser.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn render(&self, key: &LookupKey) -> Result<Readiness>;
}

/// Headless-Chromium implementation: one fresh browser per call.
#[derive(Debug, Clone)]
pub struct ChromiumPageSource {
    host: String,
    ready: ReadyOptions,
}

impl ChromiumPageSource {
    pub fn new(host: impl Into<String>, ready: ReadyOptions) -> Self {
        Self {
            host: host.into(),
            ready,
        }
    }
}

#[async_trait]
impl PageSource for ChromiumPageSource {
    async fn render(&self, key: &LookupKey) -> Result<Readiness> {
        let url = flight_tracker_url(&self.host, key)?;
        info!("Accessing URL: {}", url);

        let session = BrowserSession::acquire().await?;
        let outcome = await_ready(&session, url.as_str(), &self.ready).await;
        // Released on every outcome; a cancelled future falls back to Drop.
        session.release().await;
        outcome
    }
}
