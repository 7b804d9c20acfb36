//! Engine options for database helpers

use sqlh_core::DatabaseConfig;
use std::time::Duration;

/// Options used when building the engine handle
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Log every statement at INFO (default: false)
    pub echo: bool,
    /// Steady-state pool size, ignored for SQLite (default: 5)
    pub pool_size: u32,
    /// Extra connections above `pool_size`, ignored for SQLite (default: 10)
    pub max_overflow: u32,
    /// Connection checkout timeout in seconds (default: 30)
    pub acquire_timeout_secs: u64,
    /// Default bulk-insert batch size (default: 1000)
    pub batch_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            echo: false,
            pool_size: 5,
            max_overflow: 10,
            acquire_timeout_secs: 30,
            batch_size: 1000,
        }
    }
}

impl EngineOptions {
    /// Options with statement echo enabled
    pub fn with_echo() -> Self {
        Self {
            echo: true,
            ..Default::default()
        }
    }

    /// Build options from the `[database]` config section
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            echo: config.echo,
            pool_size: config.pool_size,
            max_overflow: config.max_overflow,
            acquire_timeout_secs: config.acquire_timeout_secs,
            batch_size: config.batch_size,
        }
    }

    /// Upper bound on open connections for pooled dialects
    pub fn max_connections(&self) -> u32 {
        (self.pool_size + self.max_overflow).max(1)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}
