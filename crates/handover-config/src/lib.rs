//! Configuration loading for Handover.
//! Reads handover.toml from the current directory or the path in HANDOVER_CONFIG,
//! then applies HANDOVER_* environment overrides (a `.env` file is honoured).

use chrono::{NaiveTime, Weekday};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid time '{value}' for {field} (expected HH:MM)")]
    InvalidTime { field: &'static str, value: String },

    #[error("unknown weekday '{0}'")]
    InvalidWeekday(String),

    #[error("booking.day_start must be before booking.day_end")]
    EmptyBookingDay,

    #[error("booking.slot_minutes must be between 5 and 480")]
    InvalidSlotLength,

    #[error("booking.min_notice_days must not exceed booking.max_advance_days")]
    InvalidBookingWindow,

    #[error("booking.min_notice_days and booking.max_advance_days must be between 0 and 3650")]
    BookingWindowOutOfRange,

    #[error("auth.magic_link_ttl_minutes must be between 1 and 525600")]
    InvalidMagicLinkTtl,

    #[error("auth.developer_link_ttl_hours must be between 1 and 8760")]
    InvalidDeveloperLinkTtl,

    #[error("auth.admin_emails must list at least one address")]
    NoAdmins,

    #[error("mail.transport = \"http\" requires mail.endpoint")]
    MissingMailEndpoint,

    #[error("unknown mail transport '{0}'")]
    UnknownMailTransport(String),
}

/// Ten years.
pub const MAX_BOOKING_WINDOW_DAYS: i64 = 3650;
/// One year.
pub const MAX_MAGIC_LINK_TTL_MINUTES: i64 = 365 * 24 * 60;
/// One year.
pub const MAX_DEVELOPER_LINK_TTL_HOURS: i64 = 365 * 24;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub booking: BookingConfig,
    pub documents: DocumentsConfig,
    pub storage: StorageConfig,
    pub finance: FinanceConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Base URL used when building links in emails.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_bind()       -> String { "127.0.0.1:3001".to_string() }
fn default_public_url() -> String { "http://localhost:3001".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind(), public_url: default_public_url() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url()    -> String { "sqlite://handover.db".to_string() }
fn default_max_connections() -> u32    { 5 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: default_database_url(), max_connections: default_max_connections() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Static admin allowlist. Compared trimmed and case-insensitively.
    #[serde(default = "default_admin_emails")]
    pub admin_emails: Vec<String>,
    #[serde(default = "default_magic_link_ttl")]
    pub magic_link_ttl_minutes: i64,
    #[serde(default = "default_developer_link_ttl")]
    pub developer_link_ttl_hours: i64,
}

fn default_admin_emails()        -> Vec<String> { vec!["admin@example.com".to_string()] }
fn default_magic_link_ttl()      -> i64 { 60 * 24 }
fn default_developer_link_ttl()  -> i64 { 72 }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_emails: default_admin_emails(),
            magic_link_ttl_minutes: default_magic_link_ttl(),
            developer_link_ttl_hours: default_developer_link_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    #[serde(default = "default_day_start")]
    pub day_start: String,
    #[serde(default = "default_day_end")]
    pub day_end: String,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
    #[serde(default = "default_working_days")]
    pub working_days: Vec<String>,
    #[serde(default = "default_min_notice_days")]
    pub min_notice_days: i64,
    #[serde(default = "default_max_advance_days")]
    pub max_advance_days: i64,
}

fn default_day_start()        -> String { "09:00".to_string() }
fn default_day_end()          -> String { "17:00".to_string() }
fn default_slot_minutes()     -> u32    { 60 }
fn default_min_notice_days()  -> i64    { 1 }
fn default_max_advance_days() -> i64    { 60 }

fn default_working_days() -> Vec<String> {
    ["mon", "tue", "wed", "thu", "fri"].iter().map(|d| d.to_string()).collect()
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            day_start: default_day_start(),
            day_end: default_day_end(),
            slot_minutes: default_slot_minutes(),
            working_days: default_working_days(),
            min_notice_days: default_min_notice_days(),
            max_advance_days: default_max_advance_days(),
        }
    }
}

impl BookingConfig {
    pub fn day_start_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_clock("booking.day_start", &self.day_start)
    }

    pub fn day_end_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_clock("booking.day_end", &self.day_end)
    }

    pub fn weekdays(&self) -> Result<Vec<Weekday>, ConfigError> {
        self.working_days
            .iter()
            .map(|d| d.parse::<Weekday>().map_err(|_| ConfigError::InvalidWeekday(d.clone())))
            .collect()
    }
}

fn parse_clock(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ConfigError::InvalidTime {
        field,
        value: value.to_string(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentsConfig {
    /// Document types that must all be approved before a unit's documents are complete.
    #[serde(default = "default_required_types")]
    pub required_types: Vec<String>,
}

fn default_required_types() -> Vec<String> {
    ["passport", "national_id", "sale_agreement"].iter().map(|d| d.to_string()).collect()
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self { required_types: default_required_types() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_content_types")]
    pub allowed_content_types: Vec<String>,
}

fn default_storage_root() -> PathBuf { PathBuf::from("./storage") }
fn default_max_upload()   -> usize   { 10 * 1024 * 1024 }

fn default_content_types() -> Vec<String> {
    ["application/pdf", "image/jpeg", "image/png"].iter().map(|d| d.to_string()).collect()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            max_upload_bytes: default_max_upload(),
            allowed_content_types: default_content_types(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinanceConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String { "AED".to_string() }

impl Default for FinanceConfig {
    fn default() -> Self {
        Self { currency: default_currency() }
    }
}

#[derive(Debug, Deserialize)]
pub struct MailConfig {
    /// "log" writes messages to the tracing output; "http" posts them to `endpoint`.
    #[serde(default = "default_transport")]
    pub transport: String,
    pub endpoint: Option<String>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_transport()    -> String { "log".to_string() }
fn default_from_address() -> String { "handover@example.com".to_string() }
fn default_from_name()    -> String { "Handover Team".to_string() }

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            endpoint: None,
            api_key: None,
            from_address: default_from_address(),
            from_name: default_from_name(),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

mod tests;

impl Config {
    /// Load configuration from handover.toml.
    /// Checks HANDOVER_CONFIG env var first, then the current directory.
    /// A missing file falls back to built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var("HANDOVER_CONFIG")
            .unwrap_or_else(|_| "handover.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_toml_str(&content)?
        } else {
            tracing::warn!(path = %path, "Config file not found, using built-in defaults");
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply HANDOVER_* overrides using the given lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("HANDOVER_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(bind) = lookup("HANDOVER_BIND") {
            self.server.bind = bind;
        }
        if let Some(key) = lookup("HANDOVER_MAIL_API_KEY") {
            self.mail.api_key = Some(SecretString::from(key));
        }
        if let Some(admins) = lookup("HANDOVER_ADMIN_EMAILS") {
            self.auth.admin_emails = admins
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let start = self.booking.day_start_time()?;
        let end = self.booking.day_end_time()?;
        if start >= end {
            return Err(ConfigError::EmptyBookingDay);
        }
        if !(5..=480).contains(&self.booking.slot_minutes) {
            return Err(ConfigError::InvalidSlotLength);
        }
        let window = 0..=MAX_BOOKING_WINDOW_DAYS;
        if !window.contains(&self.booking.min_notice_days)
            || !window.contains(&self.booking.max_advance_days)
        {
            return Err(ConfigError::BookingWindowOutOfRange);
        }
        if self.booking.min_notice_days > self.booking.max_advance_days {
            return Err(ConfigError::InvalidBookingWindow);
        }
        self.booking.weekdays()?;

        if self.auth.admin_emails.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::NoAdmins);
        }
        if !(1..=MAX_MAGIC_LINK_TTL_MINUTES).contains(&self.auth.magic_link_ttl_minutes) {
            return Err(ConfigError::InvalidMagicLinkTtl);
        }
        if !(1..=MAX_DEVELOPER_LINK_TTL_HOURS).contains(&self.auth.developer_link_ttl_hours) {
            return Err(ConfigError::InvalidDeveloperLinkTtl);
        }

        match self.mail.transport.as_str() {
            "log" => {}
            "http" if self.mail.endpoint.is_none() => return Err(ConfigError::MissingMailEndpoint),
            "http" => {}
            other => return Err(ConfigError::UnknownMailTransport(other.to_string())),
        }
        Ok(())
    }
}
