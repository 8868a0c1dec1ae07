//! Optional config from .fanoutrc or ~/.fanoutrc (JSON). Merged with env and CLI.

use std::env;
use std::path::{Path, PathBuf};

/// Optional config from file. Env and CLI override these.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub workers: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub seed: Option<u64>,
}

impl Config {
    /// Apply FANOUT_* environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_u64("FANOUT_WORKERS") {
            self.workers = Some(v as usize);
        }
        if let Some(v) = env_u64("FANOUT_TIMEOUT_MS") {
            self.timeout_ms = Some(v);
        }
        if let Some(v) = env_u64("FANOUT_MAX_DELAY_MS") {
            self.max_delay_ms = Some(v);
        }
        if let Some(v) = env_u64("FANOUT_SEED") {
            self.seed = Some(v);
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn dirs_home() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Load config from .fanoutrc in dir, then ~/.fanoutrc. Missing or invalid
/// file = default.
pub fn load_config(dir: &Path) -> Config {
    let mut cfg = Config::default();
    let home = dirs_home();
    let candidates = [
        dir.join(".fanoutrc"),
        home.map(|h| h.join(".fanoutrc"))
            .unwrap_or_else(|| dir.join(".none")),
    ];
    for path in &candidates {
        if path.is_file() {
            if let Ok(s) = std::fs::read_to_string(path) {
                if let Ok(v) = serde_json::from_str::<serde_json::Value>(&s) {
                    if let Some(w) = v.get("workers").and_then(|x| x.as_u64()) {
                        cfg.workers = Some(w as usize);
                    }
                    if let Some(t) = v.get("timeoutMs").and_then(|x| x.as_u64()) {
                        cfg.timeout_ms = Some(t);
                    }
                    if let Some(d) = v.get("maxDelayMs").and_then(|x| x.as_u64()) {
                        cfg.max_delay_ms = Some(d);
                    }
                    if let Some(s) = v.get("seed").and_then(|x| x.as_u64()) {
                        cfg.seed = Some(s);
                    }
                }
            }
            break;
        }
    }
    cfg
}
