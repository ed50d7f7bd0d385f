//! Campaign and SMTP configuration.
//!
//! Configuration is read from JSON files with camelCase keys. Every phase of
//! the engine takes only the slice of config it needs (`UrlPolicy`,
//! `DispatchPolicy`, `MailSettings`); nothing mutates the config after
//! validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::CampaignError;
use crate::token;

/// Literal placeholder in a base link marking where a generated token goes.
pub const CHANGE_MARKER: &str = "<CHANGE>";

fn default_token_length() -> usize {
    8
}

fn default_batch_size() -> usize {
    1
}

fn default_smtp_port() -> u16 {
    587
}

/// How per-recipient URLs are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlMode {
    /// Every recipient receives the same literal base link.
    #[default]
    Single,
    /// The `<CHANGE>` marker in the base link is replaced with a fresh token
    /// per recipient.
    Generated,
}

/// URL personalization policy. Immutable once the run starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlPolicy {
    #[serde(default)]
    pub mode: UrlMode,

    /// Link placed in every message; may be empty, in which case no URLs are
    /// assigned.
    #[serde(default)]
    pub base_link: String,

    /// Length of the generated token, 1..=36.
    #[serde(default = "default_token_length")]
    pub token_length: usize,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self {
            mode: UrlMode::Single,
            base_link: String::new(),
            token_length: default_token_length(),
        }
    }
}

impl UrlPolicy {
    /// Reject policies the assignment phase cannot honor.
    pub fn validate(&self) -> Result<(), CampaignError> {
        if self.mode == UrlMode::Generated {
            match self.base_link.matches(CHANGE_MARKER).count() {
                0 => {
                    return Err(CampaignError::Config(format!(
                        "generated URL mode requires {CHANGE_MARKER} in baseLink"
                    )))
                }
                1 => {}
                n => {
                    return Err(CampaignError::Config(format!(
                        "baseLink contains {CHANGE_MARKER} {n} times, expected exactly once"
                    )))
                }
            }
            token::check_length(self.token_length)?;
        }
        Ok(())
    }
}

/// Pacing policy for dispatch. Immutable once the run starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchPolicy {
    /// Send in fixed-size batches instead of one at a time.
    #[serde(default)]
    pub bulk: bool,

    /// Messages per batch when `bulk` is set.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between consecutive batches, seconds.
    #[serde(default)]
    pub batch_delay_secs: u64,

    /// Pause between consecutive messages when not in bulk mode, seconds.
    #[serde(default)]
    pub message_delay_secs: u64,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            bulk: false,
            batch_size: default_batch_size(),
            batch_delay_secs: 0,
            message_delay_secs: 0,
        }
    }
}

impl DispatchPolicy {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_secs)
    }

    pub fn message_delay(&self) -> Duration {
        Duration::from_secs(self.message_delay_secs)
    }

    pub fn validate(&self) -> Result<(), CampaignError> {
        if self.bulk && self.batch_size == 0 {
            return Err(CampaignError::Config("batchSize must be at least 1".into()));
        }
        Ok(())
    }
}

/// Message priority, carried as an `X-Priority` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    High,
}

impl Priority {
    pub fn header_value(self) -> &'static str {
        match self {
            Priority::Low => "5 (Lowest)",
            Priority::High => "1 (Highest)",
        }
    }
}

/// Header-level settings shared by every message in the run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailSettings {
    pub from_name: String,
    pub from_address: String,
    pub subject: String,

    #[serde(default)]
    pub priority: Priority,

    /// Optional HTML signature file appended to every body.
    #[serde(default)]
    pub signature: Option<PathBuf>,
}

impl MailSettings {
    pub fn validate(&self) -> Result<(), CampaignError> {
        if self.from_address.is_empty() {
            return Err(CampaignError::Config("mail.fromAddress must not be empty".into()));
        }
        Ok(())
    }
}

/// Top-level campaign configuration, constructed once and passed by reference
/// into each phase.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignConfig {
    pub mail: MailSettings,

    /// Sender persona name substituted for `{AttackerName}`.
    #[serde(default)]
    pub attacker_name: String,

    /// Free text substituted for `{Custom}`.
    #[serde(default)]
    pub custom: String,

    /// Path to the message template.
    pub template: PathBuf,

    /// Path to the two-column (name, address) target list.
    pub targets: PathBuf,

    /// Path to the SMTP settings file.
    #[serde(default)]
    pub smtp_config: Option<PathBuf>,

    /// Report file name; derived from subject and start time when absent.
    #[serde(default)]
    pub report: Option<String>,

    #[serde(default)]
    pub url: UrlPolicy,

    #[serde(default)]
    pub dispatch: DispatchPolicy,
}

impl CampaignConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CampaignError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| CampaignError::io(path, e))?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|e| CampaignError::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CampaignError> {
        self.mail.validate()?;
        self.url.validate()?;
        self.dispatch.validate()?;
        Ok(())
    }
}

/// TLS mode for the SMTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// STARTTLS upgrade on a plaintext connection (port 587).
    #[default]
    Starttls,
    /// Implicit TLS from the first byte (port 465).
    Tls,
    /// No encryption. Lab use only.
    None,
}

/// SMTP submission endpoint settings, read from their own JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpSettings {
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub tls: TlsMode,
}

impl SmtpSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CampaignError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| CampaignError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|e| CampaignError::json(path, e))
    }
}
