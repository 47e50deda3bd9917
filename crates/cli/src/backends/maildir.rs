use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use lanwarden_core::{ReplySource, WardenConfig};
use tracing::{debug, info, warn};

use super::mime::parse_message;

/// Reads replies from a local maildir folder kept in sync by an external
/// tool (mbsync, offlineimap, ...).
pub struct MaildirReplies {
    dir: PathBuf,
    max_age: Duration,
    expected_sender: Option<String>,
}

impl MaildirReplies {
    pub fn new(dir: PathBuf, max_age: Duration, expected_sender: Option<String>) -> Self {
        Self {
            dir: expand_home(&dir),
            max_age,
            expected_sender: expected_sender.map(|s| s.to_lowercase()),
        }
    }

    /// Messages older than twice the poll interval are not looked at.
    pub fn from_config(cfg: &WardenConfig) -> Self {
        let max_age = Duration::from_secs(cfg.cooldown.poll_interval_secs.saturating_mul(2));
        Self::new(
            cfg.replies.maildir.clone(),
            max_age,
            cfg.reply_sender().map(str::to_string),
        )
    }

    fn is_recent(&self, path: &Path, now: SystemTime) -> bool {
        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return true,
        };
        now.duration_since(modified)
            .map(|age| age <= self.max_age)
            .unwrap_or(true)
    }
}

impl ReplySource for MaildirReplies {
    fn fetch_replies(&self) -> Result<Vec<(String, String)>> {
        info!("reading maildir {}", self.dir.display());
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list maildir {}", self.dir.display()))?;

        let now = SystemTime::now();
        let mut replies = Vec::new();

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!("skipping unreadable maildir entry: {}", e);
                    continue;
                }
            };
            if !path.is_file() || !self.is_recent(&path, now) {
                continue;
            }

            let parsed = match std::fs::read(&path)
                .map_err(anyhow::Error::from)
                .and_then(|raw| parse_message(&raw))
            {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("failed to parse {}: {:#}", path.display(), e);
                    continue;
                }
            };

            if let Some(sender) = &self.expected_sender {
                if !parsed.from.to_lowercase().contains(sender) {
                    debug!("skipping {} from {}", path.display(), parsed.from);
                    continue;
                }
            }
            replies.push((parsed.subject, parsed.body));
        }

        info!("found {} candidate replies", replies.len());
        Ok(replies)
    }
}

/// Expands a leading `~/` using `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
