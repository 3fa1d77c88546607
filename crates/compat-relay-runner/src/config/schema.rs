use serde::Deserialize;
use compat_relay_core::error::{RelayError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    pub version: u32,

    #[serde(default)]
    pub relay: RelaySection,

    #[serde(default)]
    pub bridge: BridgeSection,

    #[serde(default)]
    pub process: Option<ProcessSection>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            relay: RelaySection::default(),
            bridge: BridgeSection::default(),
            process: None,
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RelayError::BadConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.relay.validate()?;
        self.bridge.validate()?;

        if self.relay.invoker == "process" {
            let process = self.process.as_ref().ok_or_else(|| {
                RelayError::BadConfig("relay.invoker is \"process\" but no process section is set".into())
            })?;
            if process.program.trim().is_empty() {
                return Err(RelayError::BadConfig("process.program must not be empty".into()));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    /// Registered invoker name (`bridge`, `process`, `loopback`).
    #[serde(default = "default_invoker")]
    pub invoker: String,

    /// Upper bound on a single collaborator invocation.
    #[serde(default = "default_watchdog_ms")]
    pub watchdog_ms: u64,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            invoker: default_invoker(),
            watchdog_ms: default_watchdog_ms(),
        }
    }
}

impl RelaySection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=600_000).contains(&self.watchdog_ms) {
            return Err(RelayError::BadConfig(
                "relay.watchdog_ms must be between 100 and 600000".into(),
            ));
        }
        Ok(())
    }
}

fn default_invoker() -> String {
    "bridge".into()
}
fn default_watchdog_ms() -> u64 {
    15_000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// How long a call waits for a browser page to attach.
    #[serde(default = "default_attach_timeout_ms")]
    pub attach_timeout_ms: u64,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            attach_timeout_ms: default_attach_timeout_ms(),
        }
    }
}

impl BridgeSection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=120_000).contains(&self.ping_interval_ms) {
            return Err(RelayError::BadConfig(
                "bridge.ping_interval_ms must be between 1000 and 120000".into(),
            ));
        }
        if !(5000..=600_000).contains(&self.idle_timeout_ms) {
            return Err(RelayError::BadConfig(
                "bridge.idle_timeout_ms must be between 5000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(RelayError::BadConfig(
                "bridge.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(100..=600_000).contains(&self.attach_timeout_ms) {
            return Err(RelayError::BadConfig(
                "bridge.attach_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "127.0.0.1:9797".into()
}
fn default_ping_interval_ms() -> u64 {
    20_000
}
fn default_idle_timeout_ms() -> u64 {
    60_000
}
fn default_attach_timeout_ms() -> u64 {
    30_000
}

/// Helper process speaking the frame protocol on stdin/stdout.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessSection {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}
