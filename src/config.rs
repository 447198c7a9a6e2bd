//! Environment-driven admission settings.

use std::time::Duration;

use tracing::warn;

const ENV_INVALID_WARN_INTERVAL_SECS: &str = "NEWPAYLOAD_GATE_INVALID_WARN_INTERVAL_SECS";
const ENV_SENDER_CACHE_SIZE: &str = "NEWPAYLOAD_GATE_SENDER_CACHE_SIZE";

const DEFAULT_INVALID_WARN_INTERVAL_SECS: u64 = 60;
const DEFAULT_SENDER_CACHE_SIZE: usize = 8192;

/// Tunables for [`PayloadAdmission`](crate::engine::admission::PayloadAdmission).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Minimum time between WARN logs for rejected payloads.
    pub invalid_warn_interval: Duration,
    /// Entries kept in the recovered sender cache.
    pub sender_cache_size: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            invalid_warn_interval: Duration::from_secs(DEFAULT_INVALID_WARN_INTERVAL_SECS),
            sender_cache_size: DEFAULT_SENDER_CACHE_SIZE,
        }
    }
}

impl AdmissionConfig {
    /// Loads config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var))
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        Self {
            invalid_warn_interval: Duration::from_secs(parse_env(
                &lookup,
                ENV_INVALID_WARN_INTERVAL_SECS,
                DEFAULT_INVALID_WARN_INTERVAL_SECS,
            )),
            sender_cache_size: parse_env(
                &lookup,
                ENV_SENDER_CACHE_SIZE,
                DEFAULT_SENDER_CACHE_SIZE,
            ),
        }
    }
}

fn parse_env<F, T>(lookup: &F, var: &str, default: T) -> T
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: std::str::FromStr + Copy + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(
                    target: "newpayload_gate::config",
                    env_var = var,
                    raw_value = %value,
                    %err,
                    fallback = %default,
                    "Invalid admission env var, using default"
                );
                default
            }
        },
        Err(std::env::VarError::NotPresent) => default,
        Err(err) => {
            warn!(
                target: "newpayload_gate::config",
                env_var = var,
                %err,
                fallback = %default,
                "Unreadable admission env var, using default"
            );
            default
        }
    }
}
