//! Native browser management using `chromiumoxide`.
//!
//! This module owns:
//! * Finding a usable browser executable (Chrome → Chromium → Brave, cross-platform).
//! * Building the headless launch config (no GPU, desktop UA spoof).
//! * `BrowserSession`: one browser process per lookup, never pooled.
//!
//! A session is a scoped resource: `acquire` spawns the process, `release`
//! closes it, and `Drop` closes it on any path that skipped `release`
//! (early `?` returns, deadline cancellation).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use rand::seq::IndexedRandom;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::readiness::BrowserTab;

// ── Desktop User-Agent pool ──────────────────────────────────────────────────

const DESKTOP_USER_AGENTS: &[&str] = &[
    // Chrome 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 132 – macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 131 – Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Edge 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36 Edg/132.0.0.0",
];

/// Returns a randomly-chosen desktop Chromium User-Agent string.
///
/// Only Chromium-family agents are listed so the spoofed identity matches
/// the engine actually rendering the page.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    DESKTOP_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

// ── Browser executable discovery ─────────────────────────────────────────────

const PATH_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "brave-browser",
];

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH lookup of the usual binary names
/// 3. OS-specific well-known install paths
pub fn find_chrome_executable() -> Option<String> {
    if let Some(p) = crate::core::config::chrome_executable_override() {
        return Some(p);
    }

    for exe in PATH_CANDIDATES {
        if let Ok(full) = which::which(exe) {
            return Some(full.to_string_lossy().to_string());
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/local/bin/chromium",
            "/snap/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

// ── Headless browser config builder ──────────────────────────────────────────

/// Build a `BrowserConfig` for headless, non-interactive rendering.
///
/// `--no-sandbox` and `--disable-dev-shm-usage` keep Chromium alive in
/// containers; `--disable-blink-features=AutomationControlled` hides
/// `navigator.webdriver`.
pub fn build_headless_config(exe: &str, user_agent: &str) -> Result<BrowserConfig> {
    BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: 1366,
            height: 900,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(1366, 900)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio")
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", user_agent))
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {}", e))
}

// ── Browser session ──────────────────────────────────────────────────────────

/// One headless browser process with a single tab, owned by one lookup.
pub struct BrowserSession {
    browser: Option<Browser>,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
}

impl BrowserSession {
    /// Launch a fresh headless browser using the auto-discovered executable.
    pub async fn acquire() -> Result<Self> {
        let exe = find_chrome_executable().ok_or_else(|| {
            anyhow!("No browser found. Install Chrome or Chromium, or set CHROME_EXECUTABLE.")
        })?;
        Self::acquire_with(&exe).await
    }

    /// Launch a fresh headless browser from `exe` and open one blank tab.
    pub async fn acquire_with(exe: &str) -> Result<Self> {
        let ua = random_user_agent();
        info!("🚀 Launching headless browser ({})", exe);
        debug!("user-agent: {}", ua);

        let config = build_headless_config(exe, ua)?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser ({}): {}", exe, e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("Browser close error (non-fatal): {}", close_err);
                }
                handler_task.abort();
                return Err(anyhow!("Failed to open tab: {}", e));
            }
        };

        Ok(Self {
            browser: Some(browser),
            page,
            handler_task: Some(handler_task),
        })
    }

    /// Close the browser process. Errors are logged, never returned, so a
    /// close failure cannot mask the lookup outcome.
    pub async fn release(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Browser close error (non-fatal): {}", e);
            }
            info!("🛑 Browser session released");
        }
        if let Some(handler) = self.handler_task.take() {
            handler.abort();
        }
    }
}

#[async_trait]
impl BrowserTab for BrowserSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| anyhow!("Failed to navigate to {}: {}", url, e))?;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| anyhow!("Failed to get page content: {}", e))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let handler = self.handler_task.take();
        if let Some(mut browser) = self.browser.take() {
            warn!("Browser session dropped without release; closing in background");
            let close = async move {
                if let Err(e) = browser.close().await {
                    debug!("Background browser close failed: {}", e);
                }
            };
            if let Some(handler) = handler {
                spawn_close(close, handler);
            }
        } else if let Some(handler) = handler {
            handler.abort();
        }
    }
}

/// Run `close` on the current runtime and stop the CDP handler only once it
/// has finished, since the close command is answered through that handler.
/// Without a runtime the handler is aborted straight away.
fn spawn_close<F>(close: F, handler: JoinHandle<()>)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(rt) => {
            rt.spawn(async move {
                close.await;
                handler.abort();
            });
        }
        Err(_) => handler.abort(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_is_a_desktop_chromium_identity() {
        for _ in 0..16 {
            let ua = random_user_agent();
            assert!(ua.contains("Chrome/"));
            assert!(!ua.contains("Mobile"));
        }
    }

    #[tokio::test]
    async fn background_close_keeps_handler_alive_until_done() {
        let handler = tokio::spawn(futures::future::pending::<()>());
        let watch = handler.abort_handle();
        let (finish_close, closed) = tokio::sync::oneshot::channel::<()>();

        spawn_close(
            async move {
                let _ = closed.await;
            },
            handler,
        );
        tokio::task::yield_now().await;
        assert!(!watch.is_finished(), "handler stopped before close completed");

        finish_close.send(()).unwrap();
        for _ in 0..50 {
            if watch.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(watch.is_finished());
    }
}
