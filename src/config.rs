// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the form2mail relay.
//!
//! Settings are layered from an optional `config.toml` in the working
//! directory plus `FORM2MAIL`-prefixed environment variables
//! (`FORM2MAIL__SMTP__HOST`, `FORM2MAIL__RATE_LIMIT__MAX_PER_HOUR`, ...).
//! Every field carries a default except the SMTP credentials and the
//! recipient allow-list, which have no sensible defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:3615)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Site display name interpolated into the mail subject
    #[serde(default = "default_site_name")]
    pub site_name: String,

    /// Recipient identifiers a submission may target
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Outbound SMTP configuration
    #[serde(default)]
    pub smtp: SmtpConfig,
}

/// Per-address submission rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum accepted submissions per address per retention window (default: 5)
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: u32,

    /// Retention window in seconds (default: 3600)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Cadence of the stale-event purge in seconds (default: 60)
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

/// Outbound SMTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP relay hostname
    #[serde(default)]
    pub host: String,

    /// SMTP relay port (default: 587)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Authentication username
    #[serde(default)]
    pub username: String,

    /// Authentication password
    #[serde(default)]
    pub password: String,

    /// Envelope sender address
    #[serde(default)]
    pub sender: String,

    /// Use implicit TLS instead of STARTTLS (default: false)
    #[serde(default)]
    pub implicit_tls: bool,

    /// Transport timeout in seconds (default: 30)
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:3615".to_string()
}

fn default_site_name() -> String {
    "form2mail".to_string()
}

fn default_max_per_hour() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    3600
}

fn default_purge_interval_secs() -> u64 {
    60
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            site_name: default_site_name(),
            recipients: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            smtp: SmtpConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_hour: default_max_per_hour(),
            window_secs: default_window_secs(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            sender: String::new(),
            implicit_tls: false,
            timeout_secs: default_smtp_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from `config.toml` (if present) layered with
    /// `FORM2MAIL__*` environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("FORM2MAIL")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("recipients"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// True when `recipient` (already trimmed and lowercased) is on the
    /// allow-list, compared case-insensitively.
    pub fn is_valid_recipient(&self, recipient: &str) -> bool {
        self.recipients
            .iter()
            .any(|r| r.trim().to_lowercase() == recipient)
    }
}

impl RateLimitConfig {
    /// Trailing span within which events count toward the limit.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Cadence of the background purge.
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }
}

impl SmtpConfig {
    /// Transport timeout for connecting and sending.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
