//! # Notification Ledger
//!
//! Persistent map from host key to the last time a notification went out
//! for that host. Values are validated once, when the file is decoded; the
//! in-memory map only ever holds real timestamps.
//!
//! On disk the ledger is a JSON object of `key -> ISO-8601 timestamp`.
//! Timestamps are written as RFC 3339 in UTC. Offset-less timestamps left
//! by older installs are read as UTC.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use crate::errors::{WardenError, WardenResult};
use crate::fs::AtomicFile;
use crate::key::normalize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the ledger at `path`. A missing file is an empty ledger.
    pub fn load(path: &Path) -> WardenResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(WardenError::io(path, "read", e)),
        };

        if raw.trim().is_empty() {
            warn!("ledger {} is empty, starting from a clean slate", path.display());
            return Ok(Self::new());
        }

        Self::from_json(&raw).map_err(|reason| WardenError::MalformedLedger {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Decodes and validates the JSON form.
    pub fn from_json(raw: &str) -> Result<Self, String> {
        let map: BTreeMap<String, String> =
            serde_json::from_str(raw).map_err(|e| e.to_string())?;

        let mut entries = BTreeMap::new();
        for (key, value) in map {
            let ts = parse_timestamp(&value)
                .ok_or_else(|| format!("invalid timestamp '{}' for host '{}'", value, key))?;
            entries.insert(normalize(&key), ts);
        }
        Ok(Self { entries })
    }

    pub fn to_json(&self) -> String {
        let map: BTreeMap<&str, String> = self
            .entries
            .iter()
            .map(|(k, ts)| (k.as_str(), format_timestamp(ts)))
            .collect();
        // A map of strings always serializes.
        serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn save(&self, path: &Path) -> WardenResult<()> {
        AtomicFile::write_text(path, &self.to_json())
    }

    pub fn get(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn upsert(&mut self, key: impl Into<String>, last_notified: DateTime<Utc>) {
        self.entries.insert(key.into(), last_notified);
    }

    pub fn remove(&mut self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses RFC 3339, falling back to an offset-less ISO-8601 form read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}
