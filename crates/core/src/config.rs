//! # Configuration
//!
//! Loaded from a TOML file (`LANWARDEN_CONFIG`, else `./lanwarden.toml`),
//! then overridden by environment variables. Every field has a default, so
//! a missing file simply means "run with defaults".
//!
//! ```toml
//! [storage]
//! registry = "known-hosts.csv"
//!
//! [cooldown]
//! notify_interval_secs = 86400
//!
//! [replies]
//! enabled = true
//! maildir = "~/Mail/Inbox/cur"
//! ```

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{WardenError, WardenResult};

pub const CONFIG_ENV: &str = "LANWARDEN_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "lanwarden.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub storage: StorageCfg,
    pub cooldown: CooldownCfg,
    pub notification: NotificationCfg,
    pub scanner: ScannerCfg,
    pub notifier: NotifierCfg,
    pub replies: RepliesCfg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageCfg {
    pub registry: PathBuf,
    pub ledger: PathBuf,
    pub poll_mark: PathBuf,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            registry: PathBuf::from("known-hosts.csv"),
            ledger: PathBuf::from("last_notified.json"),
            poll_mark: PathBuf::from("last_email_checked.txt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownCfg {
    /// Minimum time between two notifications about the same unknown host
    pub notify_interval_secs: u64,
    /// Minimum time between two reply-mailbox polls
    pub poll_interval_secs: u64,
}

impl Default for CooldownCfg {
    fn default() -> Self {
        Self {
            notify_interval_secs: 86_400, // 24 hours
            poll_interval_secs: 21_600,   // 6 hours
        }
    }
}

impl CooldownCfg {
    pub fn notify_interval(&self) -> Duration {
        seconds(self.notify_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        seconds(self.poll_interval_secs)
    }
}

fn seconds(secs: u64) -> Duration {
    // chrono rejects anything above i64::MAX milliseconds
    let max = i64::MAX / 1_000;
    Duration::seconds(i64::try_from(secs).unwrap_or(max).min(max))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationCfg {
    pub subject: String,
    pub prefix: String,
    /// Per-host line; `{mac}`, `{ip}` and `{hostname}` are substituted
    pub line_template: String,
    pub postfix: String,
    pub recipient: String,
    pub sender: String,
}

impl Default for NotificationCfg {
    fn default() -> Self {
        Self {
            subject: "New Device Detected on LAN".to_string(),
            prefix: "New devices detected on your LAN:".to_string(),
            line_template: "{mac}, {ip}, {hostname}".to_string(),
            postfix: "List of known devices attached for reference.\n\
                      Respond with `add <mac_addr>` to add a device to the known devices list.\n"
                .to_string(),
            recipient: String::new(),
            sender: "lanwarden@localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerCfg {
    pub command: Vec<String>,
}

impl Default for ScannerCfg {
    fn default() -> Self {
        Self {
            command: vec!["sudo".into(), "arp-scan".into(), "-l".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierCfg {
    /// Sendmail-compatible command; the recipient is appended as last argument
    pub command: Vec<String>,
}

impl Default for NotifierCfg {
    fn default() -> Self {
        Self {
            command: vec!["msmtp".into(), "--debug".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepliesCfg {
    pub enabled: bool,
    pub maildir: PathBuf,
    /// Only replies whose `From` contains this address are read. Falls back
    /// to the notification recipient.
    pub expected_sender: Option<String>,
}

impl Default for RepliesCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            maildir: PathBuf::from("~/Mail/Inbox/cur"),
            expected_sender: None,
        }
    }
}

impl WardenConfig {
    /// Reads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> WardenResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(WardenError::io(path, "read", e)),
        };
        toml::from_str(&raw).map_err(|e| WardenError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Resolves the config path, loads it, applies environment overrides and
    /// validates the result.
    pub fn from_env() -> WardenResult<Self> {
        let path = config_path(|name| std::env::var(name).ok());
        let mut cfg = Self::load(&path)?;
        cfg.apply_overrides(|name| std::env::var(name).ok());
        cfg.validate(&path)?;
        Ok(cfg)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("KNOWN_HOSTS") {
            self.storage.registry = PathBuf::from(v);
        }
        if let Some(v) = lookup("LAST_NOTIFIED_FILE") {
            self.storage.ledger = PathBuf::from(v);
        }
        if let Some(v) = lookup("EMAIL_CHECK_FILE") {
            self.storage.poll_mark = PathBuf::from(v);
        }
        if let Some(v) = parse_u64(&lookup, "NOTIFY_INTERVAL") {
            self.cooldown.notify_interval_secs = v;
        }
        if let Some(v) = parse_u64(&lookup, "EMAIL_CHECK_INTERVAL") {
            self.cooldown.poll_interval_secs = v;
        }
        if let Some(v) = lookup("EMAIL_RECEPIENT") {
            self.notification.recipient = v;
        }
        if let Some(v) = lookup("EMAIL_USERNAME") {
            self.notification.sender = v;
        }
        if let Some(v) = lookup("MAILDIR_PATH") {
            self.replies.maildir = PathBuf::from(v);
        }
        if let Some(v) = parse_bool(&lookup, "ENABLE_MAIL_RESPONSE_DEVICE_ADDING") {
            self.replies.enabled = v;
        }
    }

    pub fn validate(&self, path: &Path) -> WardenResult<()> {
        let invalid = |reason: &str| WardenError::Config {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        if self.notification.subject.trim().is_empty() {
            return Err(invalid("notification.subject must not be empty"));
        }
        if self.scanner.command.is_empty() {
            return Err(invalid("scanner.command must not be empty"));
        }
        if self.notifier.command.is_empty() {
            return Err(invalid("notifier.command must not be empty"));
        }
        Ok(())
    }

    /// Address replies must come from, if any.
    pub fn reply_sender(&self) -> Option<&str> {
        self.replies
            .expected_sender
            .as_deref()
            .or(Some(self.notification.recipient.as_str()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

pub fn config_path<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn parse_u64<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<u64> {
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring {}={:?}, expected a number of seconds", name, raw);
            None
        }
    }
}

fn parse_bool<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<bool> {
    let raw = lookup(name)?;
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!("ignoring {}={:?}, expected a boolean", name, raw);
            None
        }
    }
}
