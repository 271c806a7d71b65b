//! Process configuration from environment variables.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::queue::{DEFAULT_CONSUMER_GROUP, DEFAULT_STREAM_KEY, RedeliveryPolicy};

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Where orders, inventory and the queue live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Everything in process memory.
    InMemory,
    /// Postgres stores plus a Redis Streams queue.
    Persistent {
        database_url: String,
        redis_url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub backend: Backend,
    pub queue_key: String,
    pub consumer_group: String,
    pub workers: usize,
    /// Redis only: when unacknowledged entries are redelivered or dead-lettered.
    pub redelivery: RedeliveryPolicy,
    pub seed_inventory: bool,
    pub prometheus: bool,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration from an explicit key/value map.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let http_addr = parse_with(&get, "ORDERFLOW_HTTP_ADDR", DEFAULT_HTTP_ADDR, |v| {
            v.parse::<SocketAddr>().ok()
        })?;

        let backend = if parse_with(&get, "USE_PERSISTENT_STORES", "false", parse_bool)? {
            let database_url = get("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            Backend::Persistent {
                database_url,
                redis_url: get("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            }
        } else {
            Backend::InMemory
        };

        let workers = parse_with(&get, "ORDERFLOW_WORKERS", &DEFAULT_WORKERS.to_string(), |v| {
            v.parse::<usize>().ok().filter(|n| *n > 0)
        })?;

        let defaults = RedeliveryPolicy::default();
        let redelivery = RedeliveryPolicy {
            claim_idle: parse_with(
                &get,
                "ORDERFLOW_REDELIVERY_IDLE_MS",
                &defaults.claim_idle.as_millis().to_string(),
                |v| v.parse::<u64>().ok().filter(|ms| *ms > 0).map(Duration::from_millis),
            )?,
            max_deliveries: parse_with(
                &get,
                "ORDERFLOW_MAX_DELIVERIES",
                &defaults.max_deliveries.to_string(),
                |v| v.parse::<u64>().ok().filter(|n| *n > 0),
            )?,
        };

        Ok(Self {
            http_addr,
            backend,
            queue_key: get("ORDERFLOW_QUEUE_KEY").unwrap_or_else(|| DEFAULT_STREAM_KEY.to_string()),
            consumer_group: get("ORDERFLOW_CONSUMER_GROUP")
                .unwrap_or_else(|| DEFAULT_CONSUMER_GROUP.to_string()),
            workers,
            redelivery,
            seed_inventory: parse_with(&get, "ORDERFLOW_SEED_INVENTORY", "true", parse_bool)?,
            prometheus: parse_with(&get, "ORDERFLOW_PROMETHEUS", "true", parse_bool)?,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            backend: Backend::InMemory,
            queue_key: DEFAULT_STREAM_KEY.to_string(),
            consumer_group: DEFAULT_CONSUMER_GROUP.to_string(),
            workers: DEFAULT_WORKERS,
            redelivery: RedeliveryPolicy::default(),
            seed_inventory: true,
            prometheus: true,
        }
    }
}

fn parse_with<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    let raw = get(key).unwrap_or_else(|| default.to_string());
    parse(raw.trim()).ok_or(ConfigError::Invalid { key, value: raw })
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_are_in_memory() {
        let config = AppConfig::from_map(&HashMap::new()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn persistent_requires_database_url() {
        let err = AppConfig::from_map(&vars(&[("USE_PERSISTENT_STORES", "true")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn persistent_backend_uses_default_redis() {
        let config = AppConfig::from_map(&vars(&[
            ("USE_PERSISTENT_STORES", "1"),
            ("DATABASE_URL", "postgres://localhost/orders"),
        ]))
        .unwrap();

        assert_eq!(
            config.backend,
            Backend::Persistent {
                database_url: "postgres://localhost/orders".into(),
                redis_url: DEFAULT_REDIS_URL.into(),
            }
        );
    }

    #[test]
    fn invalid_values_name_the_key() {
        let err = AppConfig::from_map(&vars(&[("ORDERFLOW_WORKERS", "zero")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "ORDERFLOW_WORKERS",
                value: "zero".into()
            }
        );

        let err = AppConfig::from_map(&vars(&[("ORDERFLOW_WORKERS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ORDERFLOW_WORKERS", .. }));

        let err = AppConfig::from_map(&vars(&[("ORDERFLOW_HTTP_ADDR", "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ORDERFLOW_HTTP_ADDR", .. }));

        let err = AppConfig::from_map(&vars(&[("ORDERFLOW_PROMETHEUS", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ORDERFLOW_PROMETHEUS", .. }));
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_map(&vars(&[
            ("ORDERFLOW_HTTP_ADDR", "127.0.0.1:9000"),
            ("ORDERFLOW_WORKERS", "8"),
            ("ORDERFLOW_SEED_INVENTORY", "false"),
            ("ORDERFLOW_QUEUE_KEY", "q"),
        ]))
        .unwrap();

        assert_eq!(config.http_addr.port(), 9000);
        assert_eq!(config.workers, 8);
        assert!(!config.seed_inventory);
        assert_eq!(config.queue_key, "q");
    }

    #[test]
    fn defaults_come_from_the_queue_and_worker_constants() {
        let config = AppConfig::from_map(&HashMap::new()).unwrap();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.queue_key, crate::queue::DEFAULT_STREAM_KEY);
        assert_eq!(config.consumer_group, crate::queue::DEFAULT_CONSUMER_GROUP);
        assert_eq!(config.redelivery, RedeliveryPolicy::default());
    }

    #[test]
    fn redelivery_settings_are_read() {
        let config = AppConfig::from_map(&vars(&[
            ("ORDERFLOW_REDELIVERY_IDLE_MS", "1500"),
            ("ORDERFLOW_MAX_DELIVERIES", "3"),
        ]))
        .unwrap();
        assert_eq!(config.redelivery.claim_idle, Duration::from_millis(1500));
        assert_eq!(config.redelivery.max_deliveries, 3);

        let err = AppConfig::from_map(&vars(&[("ORDERFLOW_MAX_DELIVERIES", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ORDERFLOW_MAX_DELIVERIES", .. }));
    }
}
