//! Server configuration.
//!
//! Every field has a default, so a config file only needs to name the
//! settings it changes:
//!
//! ```json
//! { "bind_addr": "127.0.0.1:6000", "supervisor_interval_ms": 1000 }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::GallowsError;

/// Settings for one server instance. Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on, `host:port`.
    pub bind_addr: String,
    /// Pending-connection backlog passed to `listen`.
    pub backlog: u32,
    /// How often the lobby supervisor runs.
    pub supervisor_interval_ms: u64,
    /// Pause between a frame's header and its payload.
    pub frame_delay_ms: u64,
    /// Pause between announcements in a game, so clients can render them.
    pub pacing_delay_ms: u64,
    /// How long a liveness probe may take to write.
    pub probe_timeout_ms: u64,
    /// How long a new connection has to send a valid player descriptor.
    pub handshake_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5050".to_string(),
            backlog: 5,
            supervisor_interval_ms: 5_000,
            frame_delay_ms: 100,
            pacing_delay_ms: 500,
            probe_timeout_ms: 1_000,
            handshake_timeout_ms: 120_000,
        }
    }
}

impl ServerConfig {
    /// Parses a JSON config; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, GallowsError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: &Path) -> Result<Self, GallowsError> {
        let text = std::fs::read_to_string(path).map_err(|source| GallowsError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Replaces the host and/or port of `bind_addr`.
    pub fn override_bind(&mut self, host: Option<&str>, port: Option<u16>) {
        if host.is_none() && port.is_none() {
            return;
        }
        let (current_host, current_port) = match self.bind_addr.rsplit_once(':') {
            Some((h, p)) => (h.to_string(), p.to_string()),
            None => (self.bind_addr.clone(), String::new()),
        };
        let host = host.map_or(current_host, str::to_string);
        let port = port.map_or(current_port, |p| p.to_string());
        self.bind_addr = format!("{host}:{port}");
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<(), GallowsError> {
        if self.bind_addr.trim().is_empty() {
            return Err(GallowsError::Config("bind_addr is empty".into()));
        }
        if self.backlog == 0 {
            return Err(GallowsError::Config("backlog must be at least 1".into()));
        }
        let nonzero = [
            ("supervisor_interval_ms", self.supervisor_interval_ms),
            ("probe_timeout_ms", self.probe_timeout_ms),
            ("handshake_timeout_ms", self.handshake_timeout_ms),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(GallowsError::Config(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    pub fn supervisor_interval(&self) -> Duration {
        Duration::from_millis(self.supervisor_interval_ms)
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Converts a duration to whole milliseconds, saturating.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:5050");
        assert_eq!(config.backlog, 5);
        assert_eq!(config.supervisor_interval(), Duration::from_secs(5));
        assert_eq!(config.frame_delay(), Duration::from_millis(100));
        assert_eq!(config.pacing_delay(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = ServerConfig::from_json(r#"{ "backlog": 16 }"#).unwrap();
        assert_eq!(config.backlog, 16);
        assert_eq!(config.bind_addr, "0.0.0.0:5050");
    }

    #[test]
    fn test_from_json_rejects_garbage_and_bad_values() {
        assert!(matches!(
            ServerConfig::from_json("{ not json"),
            Err(GallowsError::ConfigParse(_))
        ));
        assert!(matches!(
            ServerConfig::from_json(r#"{ "supervisor_interval_ms": 0 }"#),
            Err(GallowsError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ServerConfig::load(Path::new("/nonexistent/gallows.json")).unwrap_err();
        assert!(matches!(err, GallowsError::ConfigRead { .. }));
        assert!(err.is_config());
    }

    #[test]
    fn test_override_bind() {
        let mut config = ServerConfig::default();
        config.override_bind(None, Some(6000));
        assert_eq!(config.bind_addr, "0.0.0.0:6000");
        config.override_bind(Some("127.0.0.1"), None);
        assert_eq!(config.bind_addr, "127.0.0.1:6000");
        config.override_bind(None, None);
        assert_eq!(config.bind_addr, "127.0.0.1:6000");
    }

    #[test]
    fn test_json_round_trip_keeps_every_field() {
        let config = ServerConfig {
            pacing_delay_ms: 7,
            ..ServerConfig::default()
        };
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(ServerConfig::from_json(&text).unwrap(), config);
    }
}
