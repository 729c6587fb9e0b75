use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::consumer::{ConsumerGroupConfig, RetryPolicy};
use crate::storage::PostgresConfig;

/// Errors raised while reading the gateway configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Gateway settings read from the environment
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub kafka_brokers: Vec<String>,
    pub kafka_group_id: String,
    pub kafka_topics: Vec<String>,
    pub postgres: PostgresConfig,
    pub http_addr: SocketAddr,
    pub max_consumer_failures: Option<u32>,
}

impl GatewayConfig {
    /// Load from the process environment, reading `.env` first when present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let kafka_brokers = split_list(&var("KAFKA_BROKERS", "localhost:9092"));
        if kafka_brokers.is_empty() {
            return Err(ConfigError::Empty("KAFKA_BROKERS"));
        }

        let kafka_topics = split_list(&var("KAFKA_TOPICS", "completed"));
        if kafka_topics.is_empty() {
            return Err(ConfigError::Empty("KAFKA_TOPICS"));
        }

        let timeout_secs: u64 = parse(
            "POSTGRES_TIMEOUT_SECS",
            &var("POSTGRES_TIMEOUT_SECS", "10"),
            "a number of seconds",
        )?;

        let postgres = PostgresConfig {
            host: var("POSTGRES_HOST", "localhost"),
            port: parse("POSTGRES_PORT", &var("POSTGRES_PORT", "5432"), "a port number")?,
            user: var("POSTGRES_USER", "postgres"),
            password: var("POSTGRES_PASSWORD", ""),
            dbname: var("POSTGRES_DB", "postgres"),
            ..Default::default()
        }
        .with_timeout(Duration::from_secs(timeout_secs));

        let max_consumer_failures = match lookup("CONSUMER_MAX_FAILURES") {
            Some(value) if !value.trim().is_empty() => {
                Some(parse("CONSUMER_MAX_FAILURES", &value, "a positive integer")?)
            }
            _ => None,
        };

        Ok(Self {
            kafka_brokers,
            kafka_group_id: var("KAFKA_GROUP_ID", "delivery-gateway"),
            kafka_topics,
            postgres,
            http_addr: parse("HTTP_ADDR", &var("HTTP_ADDR", "0.0.0.0:8080"), "a socket address")?,
            max_consumer_failures,
        })
    }

    /// Consumer-group settings with the default group policies
    pub fn consumer_group(&self) -> ConsumerGroupConfig {
        ConsumerGroupConfig::new(self.kafka_brokers.clone(), &self.kafka_group_id)
    }

    /// Retry policy for the consume loop
    pub fn retry_policy(&self) -> RetryPolicy {
        match self.max_consumer_failures {
            Some(max) => RetryPolicy::default().with_max_consecutive_failures(max),
            None => RetryPolicy::default(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse<T: std::str::FromStr>(
    name: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: value.to_string(),
    })
}
