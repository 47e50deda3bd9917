//! # Poll Cooldown
//!
//! A single persisted timestamp that throttles how often the reply channel
//! is queried. It is unrelated to the per-host notification cooldown kept in
//! the [`crate::ledger::Ledger`].

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};

use crate::errors::{WardenError, WardenResult};
use crate::fs::AtomicFile;
use crate::ledger::{format_timestamp, parse_timestamp};

/// True when there is no mark yet or at least `interval` has passed since it.
pub fn should_poll(last_poll: Option<DateTime<Utc>>, now: DateTime<Utc>, interval: Duration) -> bool {
    match last_poll {
        None => true,
        Some(last) => now - last >= interval,
    }
}

#[derive(Debug, Clone)]
pub struct PollGate {
    path: PathBuf,
    interval: Duration,
}

impl PollGate {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
        }
    }

    /// Reads the stored mark. Only the first whitespace separated token of
    /// the file is considered; a missing or blank file means "never polled".
    pub fn last_poll(&self) -> WardenResult<Option<DateTime<Utc>>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(WardenError::io(&self.path, "read", e)),
        };

        let Some(token) = raw.split_whitespace().next() else {
            return Ok(None);
        };

        parse_timestamp(token)
            .map(Some)
            .ok_or_else(|| WardenError::MalformedPollMark {
                path: self.path.clone(),
                reason: format!("'{}' is not an ISO-8601 timestamp", token),
            })
    }

    pub fn should_poll(&self, now: DateTime<Utc>) -> WardenResult<bool> {
        Ok(should_poll(self.last_poll()?, now, self.interval))
    }

    pub fn record_poll(&self, now: DateTime<Utc>) -> WardenResult<()> {
        AtomicFile::write_text(&self.path, &format_timestamp(&now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
    }

    #[test]
    fn missing_mark_polls_immediately() {
        assert!(should_poll(None, now(), Duration::hours(6)));
    }

    #[test]
    fn interval_boundary_is_inclusive() {
        let interval = Duration::hours(6);
        assert!(should_poll(Some(now() - interval), now(), interval));
        assert!(!should_poll(
            Some(now() - interval + Duration::seconds(1)),
            now(),
            interval
        ));
    }

    #[test]
    fn record_then_gate_closes() {
        let dir = tempfile::tempdir().unwrap();
        let gate = PollGate::new(dir.path().join("last_email_checked.txt"), Duration::hours(6));

        assert!(gate.should_poll(now()).unwrap());
        gate.record_poll(now()).unwrap();

        assert_eq!(gate.last_poll().unwrap(), Some(now()));
        assert!(!gate.should_poll(now() + Duration::hours(1)).unwrap());
        assert!(gate.should_poll(now() + Duration::hours(6)).unwrap());
    }

    #[test]
    fn reads_first_token_of_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_email_checked.txt");
        std::fs::write(&path, "2024-06-01T12:00:00.000123 trailing words\n").unwrap();

        let gate = PollGate::new(&path, Duration::hours(6));
        assert!(gate.last_poll().unwrap().is_some());
    }

    #[test]
    fn garbage_mark_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_email_checked.txt");
        std::fs::write(&path, "soon").unwrap();

        let gate = PollGate::new(&path, Duration::hours(6));
        assert!(matches!(
            gate.last_poll(),
            Err(WardenError::MalformedPollMark { .. })
        ));
    }
}
