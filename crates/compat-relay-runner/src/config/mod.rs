//! Relay config loader (strict parsing).

pub mod schema;

use std::fs;

use compat_relay_core::error::{RelayError, Result};

pub use schema::{BridgeSection, ProcessSection, RelayConfig, RelaySection};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "COMPAT_RELAY_CONFIG";

pub fn load_from_file(path: &str) -> Result<RelayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RelayError::BadConfig(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RelayConfig> {
    let cfg: RelayConfig = serde_yaml::from_str(s)
        .map_err(|e| RelayError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load from `$COMPAT_RELAY_CONFIG`, or fall back to defaults when unset.
pub fn load_from_env() -> Result<RelayConfig> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => load_from_file(&path),
        Err(_) => {
            tracing::info!("{CONFIG_ENV} not set; using default config");
            let cfg = RelayConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }
}
