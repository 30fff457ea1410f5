//! Environment-sourced worker configuration.
//!
//! Every knob comes from the process environment with the defaults the
//! deployment manifests assume (`db`/`redis` service hostnames, standard
//! ports). Empty values are treated as unset.

use crate::error::{Result, WorkerError};
use std::time::Duration;

/// Relational store settings and credential source selection.
///
/// When `secret_arn` is set, `username`/`password` are ignored and the
/// credentials are fetched from Secrets Manager at startup. When `url` is
/// set it overrides everything else as an opaque connection string.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub url: Option<String>,
    pub secret_arn: Option<String>,
    pub username: String,
    pub password: String,
    pub aws_region: String,
}

/// Queue store address.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub host: String,
    pub port: u16,
}

impl QueueConfig {
    /// Connection URL for the redis client.
    pub fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

/// Top-level worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    /// Poll tick for the relay loop; the idle liveness probe runs on every
    /// idle tick.
    pub poll_interval: Duration,
    /// Fixed sleep between connection attempts for either dependency.
    pub reconnect_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                host: "db".to_string(),
                port: 5432,
                database: "votes".to_string(),
                url: None,
                secret_arn: None,
                username: "postgres".to_string(),
                password: "postgres".to_string(),
                aws_region: "us-west-2".to_string(),
            },
            queue: QueueConfig {
                host: "redis".to_string(),
                port: 6379,
            },
            poll_interval: Duration::from_millis(100),
            reconnect_backoff: Duration::from_secs(1),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = env_var("DATABASE_HOST") {
            config.database.host = host;
        }
        if let Some(port) = env_var("DATABASE_PORT") {
            config.database.port = parse_var("DATABASE_PORT", &port)?;
        }
        if let Some(name) = env_var("DATABASE_NAME") {
            config.database.database = name;
        }
        config.database.url = env_var("DATABASE_URL");
        config.database.secret_arn = env_var("DATABASE_SECRET_ARN");
        if let Some(user) = env_var("DATABASE_USER") {
            config.database.username = user;
        }
        if let Some(password) = env_var("DATABASE_PASSWORD") {
            config.database.password = password;
        }
        if let Some(region) = env_var("AWS_REGION") {
            config.database.aws_region = region;
        }

        if let Some(host) = env_var("REDIS_HOST") {
            config.queue.host = host;
        }
        if let Some(port) = env_var("REDIS_PORT") {
            config.queue.port = parse_var("REDIS_PORT", &port)?;
        }

        if let Some(ms) = env_var("WORKER_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(parse_var("WORKER_POLL_INTERVAL_MS", &ms)?);
        }
        if let Some(ms) = env_var("WORKER_RECONNECT_BACKOFF_MS") {
            config.reconnect_backoff =
                Duration::from_millis(parse_var("WORKER_RECONNECT_BACKOFF_MS", &ms)?);
        }

        Ok(config)
    }
}

/// Read an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| WorkerError::Configuration(format!("Invalid {name}: {e}")))
}
