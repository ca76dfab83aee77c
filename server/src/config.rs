use crate::client_manager::OUTBOUND_QUEUE_LINES;
use crate::error::ServerError;
use serde::Deserialize;
use shared::{DEFAULT_PORT, STARTING_MONEY};
use std::path::Path;
use std::time::Duration;

/// Server settings. Every field has a default, so a config file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Port 0 lets the OS pick one.
    pub port: u16,
    pub starting_money: f64,
    pub bus_tick_ms: u64,
    pub income_interval_ms: u64,
    pub cleanup_interval_ms: u64,
    /// Connections silent for longer than this are disconnected by the cleanup job.
    pub idle_timeout_ms: u64,
    /// Lines queued for one connection before it is closed as stalled.
    pub outbound_queue_lines: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            starting_money: STARTING_MONEY,
            bus_tick_ms: 50,
            income_interval_ms: 10_000,
            cleanup_interval_ms: 10_000,
            idle_timeout_ms: 15_000,
            outbound_queue_lines: OUTBOUND_QUEUE_LINES,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: display.clone(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ServerError::ConfigParse {
            path: display,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the scheduler or the connection queues cannot run with
    pub fn validate(&self) -> Result<(), ServerError> {
        let positive = [
            ("bus_tick_ms", self.bus_tick_ms),
            ("income_interval_ms", self.income_interval_ms),
            ("cleanup_interval_ms", self.cleanup_interval_ms),
            ("outbound_queue_lines", self.outbound_queue_lines as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ServerError::InvalidConfig(format!(
                    "{name} must be greater than 0"
                )));
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn bus_tick(&self) -> Duration {
        Duration::from_millis(self.bus_tick_ms)
    }

    pub fn income_interval(&self) -> Duration {
        Duration::from_millis(self.income_interval_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:7777");
        assert_eq!(config.bus_tick(), Duration::from_millis(50));
        assert_eq!(config.income_interval(), Duration::from_secs(10));
        assert_eq!(config.cleanup_interval(), Duration::from_secs(10));
        assert_eq!(config.idle_timeout(), Duration::from_secs(15));
        assert_eq!(config.starting_money, 1000.0);
        assert_eq!(config.outbound_queue_lines, OUTBOUND_QUEUE_LINES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_periods() {
        let cases = [
            ServerConfig {
                bus_tick_ms: 0,
                ..ServerConfig::default()
            },
            ServerConfig {
                income_interval_ms: 0,
                ..ServerConfig::default()
            },
            ServerConfig {
                cleanup_interval_ms: 0,
                ..ServerConfig::default()
            },
            ServerConfig {
                outbound_queue_lines: 0,
                ..ServerConfig::default()
            },
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, ServerError::InvalidConfig(_)), "{:?}", config);
        }
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str("port = 9000\nstarting_money = 50.0\n").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.starting_money, 50.0);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.bus_tick_ms, 50);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ServerConfig::load(Path::new("/nonexistent/citybus.toml")).unwrap_err();
        assert!(matches!(err, ServerError::ConfigRead { .. }));
    }

    #[test]
    fn test_load_invalid_file() {
        let path = std::env::temp_dir().join(format!("citybus-invalid-{}.toml", std::process::id()));
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        let err = ServerConfig::load(&path).unwrap_err();
        assert!(matches!(err, ServerError::ConfigParse { .. }));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_zero_bus_tick() {
        let path = std::env::temp_dir().join(format!("citybus-zero-tick-{}.toml", std::process::id()));
        std::fs::write(&path, "bus_tick_ms = 0
").unwrap();

        let err = ServerConfig::load(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        match err {
            ServerError::InvalidConfig(reason) => assert!(reason.contains("bus_tick_ms")),
            other => panic!("unexpected error: {}", other),
        }
    }
}
