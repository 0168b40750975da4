use crate::kv::DEFAULT_NAMESPACE;
use std::path::PathBuf;
use tracing::Level;

/// Process-level settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace to open before the first request (`ROSTERD_WORKSPACE`).
    pub workspace: Option<PathBuf>,
    /// Key prefix for stored documents (`ROSTERD_NAMESPACE`).
    pub namespace: String,
    /// Log verbosity (`ROSTERD_LOG`).
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            log_level: Level::INFO,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Config::default();
        if let Some(p) = lookup("ROSTERD_WORKSPACE").filter(|s| !s.trim().is_empty()) {
            cfg.workspace = Some(PathBuf::from(p.trim()));
        }
        if let Some(ns) = lookup("ROSTERD_NAMESPACE").filter(|s| !s.trim().is_empty()) {
            cfg.namespace = ns.trim().to_string();
        }
        if let Some(level) = lookup("ROSTERD_LOG").and_then(|s| parse_level(&s)) {
            cfg.log_level = level;
        }
        cfg
    }
}

fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
