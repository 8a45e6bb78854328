// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

const DEFAULT_AUTH_REQUEUE_SECS: u64 = 1;
const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_ERROR_REQUEUE_SECS: u64 = 5;
const DEFAULT_ERROR_REQUEUE_MAX_SECS: u64 = 300;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Delay before re-checking a SecureDeployment whose authorization was denied
    pub auth_requeue: Duration,
    /// Total timeout of a single authorization request
    pub auth_timeout: Duration,
    /// Delay before the first retry of a reconciliation that returned an error
    pub error_requeue: Duration,
    /// Upper bound for the doubling retry delay of a failing object
    pub error_requeue_max: Duration,
    /// Only watch this namespace when set
    pub watch_namespace: Option<String>,
    /// Name of the operator pod, reported as the event source instance
    pub pod_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_requeue: Duration::from_secs(DEFAULT_AUTH_REQUEUE_SECS),
            auth_timeout: Duration::from_secs(DEFAULT_AUTH_TIMEOUT_SECS),
            error_requeue: Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECS),
            error_requeue_max: Duration::from_secs(DEFAULT_ERROR_REQUEUE_MAX_SECS),
            watch_namespace: None,
            pod_name: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key) {
                Some(v) => v
                    .trim()
                    .parse()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a whole number of seconds, got '{}'", key, v)),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            auth_requeue: secs("AUTH_REQUEUE_SECS", DEFAULT_AUTH_REQUEUE_SECS)?,
            auth_timeout: secs("AUTH_TIMEOUT_SECS", DEFAULT_AUTH_TIMEOUT_SECS)?,
            error_requeue: secs("ERROR_REQUEUE_SECS", DEFAULT_ERROR_REQUEUE_SECS)?,
            error_requeue_max: secs("ERROR_REQUEUE_MAX_SECS", DEFAULT_ERROR_REQUEUE_MAX_SECS)?,
            watch_namespace: non_blank("WATCH_NAMESPACE"),
            pod_name: non_blank("POD_NAME"),
        })
    }
}
