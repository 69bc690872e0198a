use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ScoutConfig: file-based config loader (flight-scout.json) with env-var fallback
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "FLIGHT_SCOUT_CONFIG";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_SOURCE_HOST: &str = "FLIGHT_SOURCE_HOST";
pub const ENV_READY_TIMEOUT_SECS: &str = "FLIGHT_READY_TIMEOUT_SECS";
pub const ENV_READY_POLL_MS: &str = "FLIGHT_READY_POLL_MS";
pub const ENV_LOOKUP_DEADLINE_SECS: &str = "FLIGHT_LOOKUP_DEADLINE_SECS";
pub const ENV_SNAPSHOT_PATH: &str = "FLIGHT_SNAPSHOT_PATH";
pub const ENV_DB_PATH: &str = "FLIGHT_DB_PATH";
pub const ENV_MAX_BROWSER_SESSIONS: &str = "FLIGHT_MAX_BROWSER_SESSIONS";

pub const DEFAULT_SOURCE_HOST: &str = "www.flightstats.com";

/// Airline display names that share the city-name shape on the tracker page.
pub const DEFAULT_AIRLINE_DISPLAY_NAMES: &[&str] = &["Malaysia Airlines", "Firefly"];

/// Top-level config loaded from `flight-scout.json`.
///
/// Every field is optional; the `resolve_*` accessors fall back to an env var
/// and then a built-in default.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ScoutConfig {
    /// Host of the tracker site, without scheme.
    pub source_host: Option<String>,
    /// Upper bound for the readiness wait. Default: 15.
    pub ready_timeout_secs: Option<u64>,
    /// Interval between readiness probes. Default: 500.
    pub ready_poll_ms: Option<u64>,
    /// Deadline for a whole cache-miss fetch (launch + wait + extract). Default: 90.
    pub lookup_deadline_secs: Option<u64>,
    /// Where the rendered markup is dumped when the page never becomes ready.
    pub snapshot_path: Option<String>,
    /// SQLite file for the record store.
    pub database_path: Option<String>,
    /// Concurrent headless browsers allowed. Default: 4.
    pub max_browser_sessions: Option<usize>,
    /// Names excluded from city candidates during route extraction.
    pub airline_display_names: Option<Vec<String>>,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_nonempty(key).and_then(|v| v.parse().ok())
}

impl ScoutConfig {
    /// Source host: JSON field → `FLIGHT_SOURCE_HOST` → `www.flightstats.com`.
    pub fn resolve_source_host(&self) -> String {
        if let Some(h) = &self.source_host {
            if !h.trim().is_empty() {
                return h.trim().to_string();
            }
        }
        env_nonempty(ENV_SOURCE_HOST).unwrap_or_else(|| DEFAULT_SOURCE_HOST.to_string())
    }

    pub fn resolve_ready_timeout(&self) -> Duration {
        let secs = self
            .ready_timeout_secs
            .or_else(|| env_parse(ENV_READY_TIMEOUT_SECS))
            .unwrap_or(15);
        Duration::from_secs(secs)
    }

    pub fn resolve_ready_poll_interval(&self) -> Duration {
        let ms = self
            .ready_poll_ms
            .or_else(|| env_parse(ENV_READY_POLL_MS))
            .unwrap_or(500)
            .max(50);
        Duration::from_millis(ms)
    }

    pub fn resolve_lookup_deadline(&self) -> Duration {
        let secs = self
            .lookup_deadline_secs
            .or_else(|| env_parse(ENV_LOOKUP_DEADLINE_SECS))
            .unwrap_or(90);
        Duration::from_secs(secs)
    }

    /// Snapshot path: JSON field → `FLIGHT_SNAPSHOT_PATH` → `./page_source.html`.
    pub fn resolve_snapshot_path(&self) -> PathBuf {
        self.snapshot_path
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| env_nonempty(ENV_SNAPSHOT_PATH))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("page_source.html"))
    }

    /// Database path: JSON field → `FLIGHT_DB_PATH` → `~/.flight-scout/flights.db`.
    ///
    /// Falls back to `./flights.db` when no home directory can be resolved.
    pub fn resolve_database_path(&self) -> PathBuf {
        if let Some(p) = self
            .database_path
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| env_nonempty(ENV_DB_PATH))
        {
            return PathBuf::from(p);
        }
        match dirs::home_dir() {
            Some(home) => home.join(".flight-scout").join("flights.db"),
            None => PathBuf::from("flights.db"),
        }
    }

    pub fn resolve_max_browser_sessions(&self) -> usize {
        self.max_browser_sessions
            .or_else(|| env_parse(ENV_MAX_BROWSER_SESSIONS))
            .unwrap_or(4)
            .max(1)
    }

    pub fn resolve_airline_display_names(&self) -> Vec<String> {
        match &self.airline_display_names {
            Some(names) => names.clone(),
            None => DEFAULT_AIRLINE_DISPLAY_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Load `flight-scout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `FLIGHT_SCOUT_CONFIG` env var path
/// 2. `./flight-scout.json`
/// 3. `../flight-scout.json`
///
/// Missing file → `ScoutConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `ScoutConfig::default()`.
pub fn load_scout_config() -> ScoutConfig {
    let mut candidates = vec![
        PathBuf::from("flight-scout.json"),
        PathBuf::from("../flight-scout.json"),
    ];
    if let Some(env_path) = env_nonempty(ENV_CONFIG_PATH) {
        candidates.insert(0, PathBuf::from(env_path));
    }

    for path in &candidates {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        return match parse_scout_config(&contents) {
            Ok(cfg) => {
                tracing::info!("flight-scout.json loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    "flight-scout.json parse error at {}: {}; using defaults",
                    path.display(),
                    e
                );
                ScoutConfig::default()
            }
        };
    }

    ScoutConfig::default()
}

pub fn parse_scout_config(contents: &str) -> serde_json::Result<ScoutConfig> {
    serde_json::from_str(contents)
}

/// Optional override for the Chromium-family browser executable.
///
/// Only returns a value when `CHROME_EXECUTABLE` is set to an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = env_nonempty(ENV_CHROME_EXECUTABLE)?;
    if Path::new(&p).exists() {
        Some(p)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_take_precedence() {
        let cfg = parse_scout_config(
            r#"{
                "source_host": "staging.example.test",
                "ready_timeout_secs": 3,
                "ready_poll_ms": 100,
                "snapshot_path": "/tmp/snap.html",
                "airline_display_names": ["AirAsia"]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.resolve_source_host(), "staging.example.test");
        assert_eq!(cfg.resolve_ready_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.resolve_ready_poll_interval(), Duration::from_millis(100));
        assert_eq!(cfg.resolve_snapshot_path(), PathBuf::from("/tmp/snap.html"));
        assert_eq!(cfg.resolve_airline_display_names(), vec!["AirAsia"]);
    }

    #[test]
    fn empty_file_parses_to_defaults() {
        let cfg = parse_scout_config("{}").unwrap();
        assert!(cfg.source_host.is_none());
        assert_eq!(
            cfg.resolve_airline_display_names(),
            vec!["Malaysia Airlines", "Firefly"]
        );
    }

    #[test]
    fn poll_interval_has_a_floor() {
        let cfg = ScoutConfig {
            ready_poll_ms: Some(1),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_ready_poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn unknown_json_is_rejected_by_type() {
        assert!(parse_scout_config(r#"{"ready_timeout_secs": "soon"}"#).is_err());
    }
}
