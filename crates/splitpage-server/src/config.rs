//! Server configuration for `splitpage`.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `SPLITPAGE_*` environment variables.

use std::net::SocketAddr;

use splitpage_core::catalog::{DEFAULT_WEIGHTS, VariantCatalog};
use splitpage_core::error::CatalogError;
use splitpage_core::routing::{DEFAULT_ENTRY_PATH, RoutingConfig, Strategy};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Variant weight table, e.g. `A=25,B=25,C=25,D=25`.
    pub variant_weights: String,
    /// Path that triggers cookie-backed assignment.
    pub entry_path: String,
    /// Enabled routing strategies.
    pub strategies: Vec<Strategy>,
    /// Path to a JSON-lines file collected events are appended to.
    pub analytics_file: Option<String>,
    /// Size at which the analytics file is rotated to `<file>.1`.
    pub analytics_file_max_bytes: Option<u64>,
    /// Whether collected events are written to the structured log.
    pub analytics_log: bool,
    /// Maximum concurrent requests to the analytics collector.
    pub analytics_concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`)
    /// - `SPLITPAGE_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:3000`)
    /// - `SPLITPAGE_LOG_LEVEL`: log filter (default: `info`)
    /// - `SPLITPAGE_VARIANT_WEIGHTS`: weight table (default: `A=25,B=25,C=25,D=25`)
    /// - `SPLITPAGE_ENTRY_PATH`: assignment entry path (default: `/landing`)
    /// - `SPLITPAGE_ROUTING`: comma list of `path`, `host`, or `none` (default: `path,host`)
    /// - `SPLITPAGE_ANALYTICS_FILE`: JSON-lines event file (optional)
    /// - `SPLITPAGE_ANALYTICS_FILE_MAX_BYTES`: rotate the event file past this size (optional)
    /// - `SPLITPAGE_ANALYTICS_LOG`: log collected events (default: `true`)
    /// - `SPLITPAGE_ANALYTICS_CONCURRENCY`: collector concurrency cap (default: `256`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Priority: SPLITPAGE_BIND_ADDR > PORT > default 127.0.0.1:3000
        let bind_addr = if let Some(addr) = lookup("SPLITPAGE_BIND_ADDR") {
            addr.parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3000)))
        } else if let Some(port_str) = lookup("PORT") {
            let port: u16 = port_str.parse().unwrap_or(3000);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], 3000))
        };

        let log_level = lookup("SPLITPAGE_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let variant_weights =
            lookup("SPLITPAGE_VARIANT_WEIGHTS").unwrap_or_else(|| DEFAULT_WEIGHTS.to_owned());

        let entry_path = lookup("SPLITPAGE_ENTRY_PATH")
            .map(|p| normalize_entry_path(&p))
            .unwrap_or_else(|| DEFAULT_ENTRY_PATH.to_owned());

        let strategies = lookup("SPLITPAGE_ROUTING")
            .map_or_else(|| vec![Strategy::Host, Strategy::Path], |v| parse_strategies(&v));

        let analytics_file = lookup("SPLITPAGE_ANALYTICS_FILE").filter(|p| !p.is_empty());

        let analytics_file_max_bytes = lookup("SPLITPAGE_ANALYTICS_FILE_MAX_BYTES")
            .and_then(|v| v.parse().ok())
            .filter(|n: &u64| *n > 0);

        let analytics_log = lookup("SPLITPAGE_ANALYTICS_LOG")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let analytics_concurrency = lookup("SPLITPAGE_ANALYTICS_CONCURRENCY")
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(256);

        Self {
            bind_addr,
            log_level,
            variant_weights,
            entry_path,
            strategies,
            analytics_file,
            analytics_file_max_bytes,
            analytics_log,
            analytics_concurrency,
        }
    }

    /// Build the variant catalog from the configured weight table.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the weight table is empty, malformed,
    /// or sums to zero.
    pub fn catalog(&self) -> Result<VariantCatalog, CatalogError> {
        VariantCatalog::parse_weights(&self.variant_weights)
    }

    /// Router settings derived from this configuration.
    #[must_use]
    pub fn routing(&self) -> RoutingConfig {
        RoutingConfig {
            entry_path: self.entry_path.clone(),
            strategies: self.strategies.clone(),
        }
    }
}

/// Ensure a leading slash and drop trailing ones; `/` alone falls back to the default.
fn normalize_entry_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_ENTRY_PATH.to_owned();
    }
    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

/// Unknown names are skipped; `none` disables routing entirely.
fn parse_strategies(raw: &str) -> Vec<Strategy> {
    let mut out = Vec::new();
    for part in raw.split(',') {
        if part.trim().eq_ignore_ascii_case("none") {
            return Vec::new();
        }
        if let Ok(strategy) = part.parse::<Strategy>() {
            if !out.contains(&strategy) {
                out.push(strategy);
            }
        }
    }
    out
}
