//! Page readiness gate.
//!
//! The tracker page renders its flight card client-side, so the initial
//! load event says nothing about whether data is present. After navigating
//! we poll the rendered DOM until one of the readiness markers shows up in
//! the visible text, a challenge page is detected, or the time bound runs
//! out.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use scraper::{Html, Node};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::antibot;
use crate::core::types::LookupKey;

/// Text fragments that only appear once the flight card has rendered.
pub const READY_MARKERS: &[&str] = &["Flight Status", "Arrived"];

/// The slice of a browser tab the gate needs.
#[async_trait]
pub trait BrowserTab: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;
    async fn content(&self) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ReadyOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Destination for the rendered markup when the page never becomes ready.
    pub snapshot_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Final rendered markup carrying a readiness marker.
    Ready(String),
    TimedOut,
    /// A challenge page was detected; the payload is the reason label.
    Blocked(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    Ready,
    Blocked(&'static str),
    Pending,
}

/// `https://{host}/v2/flight-tracker/{airline}/{number}?date=YYYY-MM-DD`
pub fn flight_tracker_url(host: &str, key: &LookupKey) -> Result<Url> {
    let mut url = Url::parse(&format!("https://{}/v2/flight-tracker/", host))
        .with_context(|| format!("invalid source host: {}", host))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("source URL cannot carry a path: {}", host))?
        .pop_if_empty()
        .push(&key.airline_code)
        .push(&key.flight_number);
    url.query_pairs_mut().append_pair(
        "date",
        &key.departure_date.format("%Y-%m-%d").to_string(),
    );
    Ok(url)
}

/// Text nodes a user would see on the page itself. Document metadata such
/// as `<title>` and script bodies are skipped.
pub fn visible_text_nodes(doc: &Html) -> impl Iterator<Item = &str> {
    doc.root_element().descendants().filter_map(|node| {
        let Node::Text(text) = node.value() else {
            return None;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .map(|el| {
                matches!(
                    el.name(),
                    "script" | "style" | "noscript" | "template" | "title"
                )
            })
            .unwrap_or(false);
        if hidden {
            None
        } else {
            Some(&**text)
        }
    })
}

/// Classify one rendered snapshot.
pub fn page_state(html: &str) -> PageState {
    let doc = Html::parse_document(html);
    if visible_text_nodes(&doc).any(|t| READY_MARKERS.iter().any(|m| t.contains(m))) {
        return PageState::Ready;
    }
    let text = visible_text_nodes(&doc).collect::<Vec<_>>().join(" ");
    match antibot::detect_block_reason(&text) {
        Some(reason) => PageState::Blocked(reason),
        None => PageState::Pending,
    }
}

/// Dump rendered markup for offline inspection. Failures are logged only.
pub fn write_snapshot(path: &Path, html: &str) {
    match std::fs::write(path, html) {
        Ok(()) => info!(
            "📝 Saved page source ({} bytes) to '{}' for inspection",
            html.len(),
            path.display()
        ),
        Err(e) => warn!("Failed to write page snapshot {}: {}", path.display(), e),
    }
}

/// Navigate `tab` to `url` and block until the flight card has rendered.
///
/// Navigation errors propagate; a page that loads but never shows a marker
/// is `TimedOut`, not an error.
pub async fn await_ready(tab: &dyn BrowserTab, url: &str, opts: &ReadyOptions) -> Result<Readiness> {
    info!("🌐 Navigating to: {}", url);
    tab.goto(url).await?;

    let start = Instant::now();
    let mut last_html = String::new();

    loop {
        match tab.content().await {
            Ok(html) => {
                match page_state(&html) {
                    PageState::Ready => {
                        info!(
                            "✅ Page ready after {}ms ({} chars)",
                            start.elapsed().as_millis(),
                            html.len()
                        );
                        return Ok(Readiness::Ready(html));
                    }
                    PageState::Blocked(reason) => {
                        warn!("🛡️ Anti-bot interstitial detected ({}), aborting", reason);
                        write_snapshot(&opts.snapshot_path, &html);
                        return Ok(Readiness::Blocked(reason.to_string()));
                    }
                    PageState::Pending => {}
                }
                last_html = html;
            }
            Err(e) => debug!("readiness probe failed, retrying: {}", e),
        }

        let elapsed = start.elapsed();
        if elapsed >= opts.timeout {
            break;
        }
        tokio::time::sleep(opts.poll_interval.min(opts.timeout - elapsed)).await;
    }

    warn!(
        "Flight details not found after {}s. Possible CAPTCHA or page structure change.",
        opts.timeout.as_secs_f32()
    );
    write_snapshot(&opts.snapshot_path, &last_html);
    Ok(Readiness::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn url_preserves_path_and_query_shape() {
        let key = LookupKey::new("MH", "716", NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        let url = flight_tracker_url("www.flightstats.com", &key).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.flightstats.com/v2/flight-tracker/MH/716?date=2024-01-05"
        );
    }

    #[test]
    fn markers_in_scripts_do_not_count() {
        let html = r#"<html><head><script>var s = "Flight Status";</script></head>
            <body><div>Loading…</div></body></html>"#;
        assert_eq!(page_state(html), PageState::Pending);
    }

    #[test]
    fn marker_in_title_only_is_still_pending() {
        let html = r#"<html><head><title>MH716 Flight Status | FlightStats</title></head>
            <body><div>Loading</div></body></html>"#;
        assert_eq!(page_state(html), PageState::Pending);
    }

    #[test]
    fn either_marker_means_ready() {
        assert_eq!(
            page_state("<html><body><div>Flight Status</div></body></html>"),
            PageState::Ready
        );
        assert_eq!(
            page_state("<html><body><span>Arrived</span></body></html>"),
            PageState::Ready
        );
    }

    #[test]
    fn challenge_page_is_blocked() {
        let html = "<html><body><h1>Please verify you are human</h1></body></html>";
        assert_eq!(page_state(html), PageState::Blocked("captcha"));
    }
}
