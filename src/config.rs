//! Runtime configuration read from the environment

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Environment variable for the Postgres connection string
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Environment variable for the comma-separated relay endpoints
pub const ENV_RELAYS: &str = "EMDR_RELAYS";

/// Environment variable for the anomaly rejection multiplier
pub const ENV_REJECTION_MULTIPLIER: &str = "STDDEV_REJECTION_MULTIPLIER";

/// Environment variable for the status counter flush interval
pub const ENV_EMDR_STATS_INTERVAL: &str = "EMDR_STATS_INTERVAL_SECS";

/// Environment variable for the throughput report interval
pub const ENV_STATUS_INTERVAL: &str = "STATUS_INTERVAL_SECS";

/// Environment variable toggling the throughput report
pub const ENV_DISPLAY_STATS: &str = "DISPLAY_STATS";

/// Environment variable toggling verbose diagnostics
pub const ENV_EXTENSIVE_LOGGING: &str = "EXTENSIVE_LOGGING";

/// Environment variable for the per-stage store concurrency bound
pub const ENV_MAX_CONCURRENT_STORE_OPS: &str = "MAX_CONCURRENT_STORE_OPS";

/// Environment variable for the number of decoded messages processed at once
pub const ENV_MAX_IN_FLIGHT_MESSAGES: &str = "MAX_IN_FLIGHT_MESSAGES";

const DEFAULT_REJECTION_MULTIPLIER: f64 = 3.0;
const DEFAULT_EMDR_STATS_INTERVAL_SECS: u64 = 300;
const DEFAULT_STATUS_INTERVAL_SECS: u64 = 5;
const DEFAULT_MAX_CONCURRENT_STORE_OPS: usize = 16;
const DEFAULT_MAX_IN_FLIGHT_MESSAGES: usize = 64;

/// Stages that hold a store connection while they run
const STORE_STAGES: u32 = 4;
/// Status flush plus one spare for migrations at startup
const EXTRA_CONNECTIONS: u32 = 2;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub relays: Vec<String>,
    pub rejection_multiplier: f64,
    pub emdr_stats_interval: Duration,
    pub status_interval: Duration,
    pub display_stats: bool,
    pub extensive_logging: bool,
    pub max_concurrent_store_ops: usize,
    pub max_in_flight_messages: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(ENV_DATABASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_DATABASE_URL))?;

        let relays: Vec<String> = lookup(ENV_RELAYS)
            .map(|v| {
                v.split(',')
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if relays.is_empty() {
            return Err(ConfigError::Missing(ENV_RELAYS));
        }

        let rejection_multiplier: f64 = parse_or(
            &lookup,
            ENV_REJECTION_MULTIPLIER,
            DEFAULT_REJECTION_MULTIPLIER,
        )?;
        if !rejection_multiplier.is_finite() || rejection_multiplier <= 0.0 {
            return Err(invalid(
                ENV_REJECTION_MULTIPLIER,
                rejection_multiplier.to_string(),
                "must be a positive number",
            ));
        }

        let emdr_stats_secs: u64 = parse_or(
            &lookup,
            ENV_EMDR_STATS_INTERVAL,
            DEFAULT_EMDR_STATS_INTERVAL_SECS,
        )?;
        let status_secs: u64 = parse_or(&lookup, ENV_STATUS_INTERVAL, DEFAULT_STATUS_INTERVAL_SECS)?;
        let max_concurrent_store_ops: usize = parse_or(
            &lookup,
            ENV_MAX_CONCURRENT_STORE_OPS,
            DEFAULT_MAX_CONCURRENT_STORE_OPS,
        )?;
        let max_in_flight_messages: usize = parse_or(
            &lookup,
            ENV_MAX_IN_FLIGHT_MESSAGES,
            DEFAULT_MAX_IN_FLIGHT_MESSAGES,
        )?;

        for (var, value) in [
            (ENV_EMDR_STATS_INTERVAL, emdr_stats_secs as usize),
            (ENV_STATUS_INTERVAL, status_secs as usize),
            (ENV_MAX_CONCURRENT_STORE_OPS, max_concurrent_store_ops),
            (ENV_MAX_IN_FLIGHT_MESSAGES, max_in_flight_messages),
        ] {
            if value == 0 {
                return Err(invalid(var, "0".to_string(), "must be greater than zero"));
            }
        }

        Ok(Self {
            database_url,
            relays,
            rejection_multiplier,
            emdr_stats_interval: Duration::from_secs(emdr_stats_secs),
            status_interval: Duration::from_secs(status_secs),
            display_stats: flag_or(&lookup, ENV_DISPLAY_STATS, true),
            extensive_logging: flag_or(&lookup, ENV_EXTENSIVE_LOGGING, false),
            max_concurrent_store_ops,
            max_in_flight_messages,
        })
    }

    /// Connection pool size that covers every store permit at once
    pub fn pool_size(&self) -> u32 {
        let per_stage = u32::try_from(self.max_concurrent_store_ops).unwrap_or(u32::MAX);
        per_stage
            .saturating_mul(STORE_STAGES)
            .saturating_add(EXTRA_CONNECTIONS)
    }
}

fn invalid(var: &'static str, value: String, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value,
        reason: reason.to_string(),
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(var, raw.clone(), &e.to_string())),
    }
}

fn flag_or<F>(lookup: &F, var: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}
