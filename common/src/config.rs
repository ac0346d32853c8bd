// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared contact-form configuration.
//!
//! One JSON document drives both the form page and the submission endpoint.
//! Missing sections fall back to the defaults below; patterns are compiled
//! while loading so a broken rule is reported before any submission is
//! judged against it.

use crate::rules::{CompiledRules, RuleCompileError};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration load errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config document must be a JSON object")]
    NotAnObject,

    #[error(transparent)]
    Rule(#[from] RuleCompileError),

    #[error("limits.rateLimitPerHour must be at least 1")]
    InvalidRateLimit,
}

/// The config document as written on disk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Front-end element selectors, passed through untouched.
    #[serde(default)]
    pub selectors: Value,

    /// Front-end colours, passed through untouched.
    #[serde(default)]
    pub styles: Value,

    #[serde(default, deserialize_with = "null_as_default")]
    pub validation: ValidationConfig,

    #[serde(default, deserialize_with = "null_as_default")]
    pub limits: LimitsConfig,

    #[serde(default, deserialize_with = "null_as_default")]
    pub mail: MailConfig,

    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: MessagesConfig,

    /// Front-end submit URL and headers, passed through untouched.
    #[serde(default)]
    pub network: Value,
}

/// Validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_regex_flags: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_regex_flags: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_regex_flags: Option<String>,

    /// Minimum message length in characters (default: 10)
    #[serde(default = "default_min_message_length")]
    pub min_message_length: usize,

    /// Validate the phone field even when it is left blank (default: false)
    #[serde(default)]
    pub require_phone: bool,

    /// Reject messages containing links (default: false)
    #[serde(default)]
    pub block_urls: bool,
}

/// Submission limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsConfig {
    /// Accepted submissions per identifier per hour (default: 5)
    #[serde(default = "default_rate_limit_per_hour")]
    pub rate_limit_per_hour: u32,

    /// Directory holding the per-identifier buckets
    #[serde(default, alias = "rateStore")]
    pub rate_store_path: Option<PathBuf>,
}

/// Mail composition and transport settings.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailConfig {
    /// Recipients in document order, address → display label
    #[serde(default, deserialize_with = "deserialize_recipients")]
    pub to: Vec<Recipient>,

    #[serde(default = "default_from")]
    pub from: String,

    #[serde(default = "default_subject")]
    pub subject: String,

    #[serde(default)]
    pub mode: MailMode,

    /// Output directory of the `file` backend
    #[serde(default = "default_file_path")]
    pub file_path: PathBuf,

    #[serde(default = "default_smtp_host")]
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub auth: bool,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub secure: SecureSetting,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Command used by the `sendmail` backend instead of the system default
    #[serde(default)]
    pub sendmail_path: Option<String>,
}

/// A single configured recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub address: String,
    pub label: String,
}

/// Mail backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum MailMode {
    /// Write each message to a timestamped file
    File,
    /// Relay through an SMTP server
    Smtp,
    /// Hand off to the local sendmail binary
    #[default]
    Sendmail,
}

impl From<String> for MailMode {
    fn from(mode: String) -> Self {
        match mode.to_ascii_lowercase().as_str() {
            "file" => MailMode::File,
            "smtp" => MailMode::Smtp,
            // "mail", "native", "sendmail" and anything unknown
            _ => MailMode::Sendmail,
        }
    }
}

/// `secure` accepts either a boolean or a mode string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecureSetting {
    Flag(bool),
    Mode(String),
}

impl Default for SecureSetting {
    fn default() -> Self {
        SecureSetting::Flag(false)
    }
}

impl SecureSetting {
    pub fn requires_starttls(&self) -> bool {
        match self {
            SecureSetting::Flag(flag) => *flag,
            SecureSetting::Mode(mode) => {
                matches!(mode.to_ascii_lowercase().as_str(), "tls" | "starttls")
            }
        }
    }
}

/// User-facing texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesConfig {
    #[serde(default = "default_success_html", alias = "successHTML")]
    pub success_html: String,

    #[serde(default = "default_fail_html", alias = "failHTML")]
    pub fail_html: String,

    #[serde(default = "default_bad_request_html")]
    pub bad_request_html: String,

    #[serde(default = "default_rate_html")]
    pub rate_html: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub field_errors: FieldMessages,
}

/// Per-field error texts shared by every validation consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldMessages {
    pub name_required: String,
    pub name_invalid: String,
    pub email_invalid: String,
    pub phone_invalid: String,
    pub message_required: String,
    /// `{min}` is replaced with the configured minimum length
    pub message_too_short: String,
    pub message_has_links: String,
}

impl FieldMessages {
    pub fn too_short(&self, min: usize) -> String {
        self.message_too_short.replace("{min}", &min.to_string())
    }
}

// Default value functions
fn default_min_message_length() -> usize {
    10
}

fn default_rate_limit_per_hour() -> u32 {
    5
}

fn default_from() -> String {
    "no-reply@example.com".to_string()
}

fn default_subject() -> String {
    "New contact form submission".to_string()
}

fn default_file_path() -> PathBuf {
    PathBuf::from("logs")
}

fn default_smtp_host() -> String {
    "127.0.0.1".to_string()
}

fn default_smtp_port() -> u16 {
    1025
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_success_html() -> String {
    "Thanks!".to_string()
}

fn default_fail_html() -> String {
    "Send failed.".to_string()
}

fn default_bad_request_html() -> String {
    "Please fix the highlighted fields and try again.".to_string()
}

fn default_rate_html() -> String {
    "Too many submissions. Please try again later.".to_string()
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            email_regex: None,
            email_regex_flags: None,
            phone_regex: None,
            phone_regex_flags: None,
            url_regex: None,
            url_regex_flags: None,
            min_message_length: default_min_message_length(),
            require_phone: false,
            block_urls: false,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_hour: default_rate_limit_per_hour(),
            rate_store_path: None,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            to: Vec::new(),
            from: default_from(),
            subject: default_subject(),
            mode: MailMode::default(),
            file_path: default_file_path(),
            host: default_smtp_host(),
            port: default_smtp_port(),
            auth: false,
            username: String::new(),
            password: String::new(),
            secure: SecureSetting::default(),
            timeout_secs: default_timeout_secs(),
            sendmail_path: None,
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            success_html: default_success_html(),
            fail_html: default_fail_html(),
            bad_request_html: default_bad_request_html(),
            rate_html: default_rate_html(),
            field_errors: FieldMessages::default(),
        }
    }
}

impl Default for FieldMessages {
    fn default() -> Self {
        Self {
            name_required: "Name is required.".to_string(),
            name_invalid: "Please enter a valid name.".to_string(),
            email_invalid: "Please enter a valid email address.".to_string(),
            phone_invalid: "Please enter a valid phone number.".to_string(),
            message_required: "Message is required.".to_string(),
            message_too_short: "Message must be at least {min} characters.".to_string(),
            message_has_links: "Please remove URLs from the message.".to_string(),
        }
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("to", &self.to)
            .field("from", &self.from)
            .field("subject", &self.subject)
            .field("mode", &self.mode)
            .field("file_path", &self.file_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth", &self.auth)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("secure", &self.secure)
            .field("timeout_secs", &self.timeout_secs)
            .field("sendmail_path", &self.sendmail_path)
            .finish()
    }
}

impl LimitsConfig {
    /// Directory for rate-limit buckets, defaulting to a temp subdirectory.
    pub fn rate_store_dir(&self) -> PathBuf {
        self.rate_store_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("cf_rate_limit"))
    }
}

/// An explicit `null` section is treated like a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keeps `to` in document order; a JSON object is otherwise unordered once
/// it lands in a map type.
fn deserialize_recipients<'de, D>(deserializer: D) -> Result<Vec<Recipient>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RecipientsVisitor;

    impl<'de> Visitor<'de> for RecipientsVisitor {
        type Value = Vec<Recipient>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object mapping addresses to labels")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut recipients = Vec::new();
            while let Some((address, label)) = map.next_entry::<String, Option<String>>()? {
                recipients.push(Recipient {
                    address,
                    label: label.unwrap_or_default(),
                });
            }
            Ok(recipients)
        }
    }

    deserializer.deserialize_map(RecipientsVisitor)
}

/// Immutable config snapshot with its rules compiled.
#[derive(Debug, Clone)]
pub struct Config {
    pub selectors: Value,
    pub styles: Value,
    pub validation: ValidationConfig,
    pub limits: LimitsConfig,
    pub mail: MailConfig,
    pub messages: MessagesConfig,
    pub network: Value,
    pub rules: CompiledRules,
}

impl Config {
    /// Read and compile the document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = text.len(), "Loaded config document");
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(ConfigError::NotAnObject);
        }
        let document: ConfigDocument = serde_json::from_value(value)?;
        Self::from_document(document)
    }

    pub fn from_document(document: ConfigDocument) -> Result<Self, ConfigError> {
        if document.limits.rate_limit_per_hour == 0 {
            return Err(ConfigError::InvalidRateLimit);
        }
        let rules = CompiledRules::compile(&document.validation, &document.messages.field_errors)?;

        let ConfigDocument {
            selectors,
            styles,
            validation,
            limits,
            mail,
            messages,
            network,
        } = document;

        Ok(Self {
            selectors,
            styles,
            validation,
            limits,
            mail,
            messages,
            network,
            rules,
        })
    }

    /// The part of the document the form page needs. Mail transport
    /// settings and limits never leave the server.
    pub fn client_view(&self) -> Value {
        serde_json::json!({
            "selectors": self.selectors,
            "styles": self.styles,
            "validation": self.validation,
            "messages": self.messages,
            "network": self.network,
        })
    }
}
