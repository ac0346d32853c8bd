// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Process settings for the contact form endpoint.
//!
//! These only decide where the service listens and where it finds the shared
//! form document. Everything about validation, limits and mail lives in that
//! document and is reloaded on every request.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the contact form service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Shared form document (default: config/mailer.config.json)
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    /// Path the form posts to (default: /submit)
    #[serde(default = "default_submit_path")]
    pub submit_path: String,

    /// Where rate-limit buckets are kept (default: file)
    #[serde(default)]
    pub rate_store: RateStoreBackend,

    /// Origins allowed to call the service cross-site; empty disables CORS
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Rate-limit bucket backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateStoreBackend {
    /// One file per identifier under the document's `limits.rateStorePath`;
    /// shared by every process on the host
    #[default]
    File,
    /// In-process map; lost on restart
    Memory,
}

impl std::str::FromStr for RateStoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown rate store backend: {other}")),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_config_path() -> PathBuf {
    PathBuf::from("config/mailer.config.json")
}

fn default_submit_path() -> String {
    "/submit".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// Routes must start with `/`.
fn route_path(raw: String) -> String {
    if raw.starts_with('/') {
        raw
    } else {
        format!("/{raw}")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            config_path: default_config_path(),
            submit_path: default_submit_path(),
            rate_store: RateStoreBackend::default(),
            allowed_origins: Vec::new(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl ServerConfig {
    /// Load settings from environment variables, falling back to defaults.
    ///
    /// - `BIND_ADDR`
    /// - `CONTACT_CONFIG_PATH`
    /// - `SUBMIT_PATH`
    /// - `RATE_STORE` (`file` or `memory`)
    /// - `ALLOWED_ORIGINS` (comma separated)
    /// - `METRICS_ENABLED`, `METRICS_PATH`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            config_path: lookup("CONTACT_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            submit_path: lookup("SUBMIT_PATH")
                .map(route_path)
                .unwrap_or(defaults.submit_path),
            rate_store: lookup("RATE_STORE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_store),
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            metrics: MetricsConfig {
                enabled: lookup("METRICS_ENABLED")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.metrics.enabled),
                path: lookup("METRICS_PATH")
                    .map(route_path)
                    .unwrap_or(defaults.metrics.path),
            },
        }
    }
}
