//! End-to-end runs of the orchestrator over temporary state files, with
//! in-memory collaborators.

use std::cell::RefCell;
use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use lanwarden_core::{
    Attachment, HostObservation, Ledger, Notifier, Registry, ReplySource, Scanner, Warden,
    WardenConfig, WardenError,
};

struct FakeScanner(Result<Vec<HostObservation>, String>);

impl Scanner for FakeScanner {
    fn scan(&self) -> Result<Vec<HostObservation>> {
        self.0.clone().map_err(|e| anyhow!(e))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: RefCell<Vec<(String, String, Option<Attachment>)>>,
    fail: bool,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, subject: &str, body: &str, attachment: Option<&Attachment>) -> Result<()> {
        self.sent
            .borrow_mut()
            .push((subject.to_string(), body.to_string(), attachment.cloned()));
        if self.fail {
            return Err(anyhow!("smtp unreachable"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeReplies {
    messages: Vec<(String, String)>,
    calls: RefCell<usize>,
    fail: bool,
}

impl ReplySource for FakeReplies {
    fn fetch_replies(&self) -> Result<Vec<(String, String)>> {
        *self.calls.borrow_mut() += 1;
        if self.fail {
            return Err(anyhow!("maildir not mounted"));
        }
        Ok(self.messages.clone())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 10, 1, 12, 0, 0).unwrap()
}

fn config(dir: &Path, replies: bool) -> WardenConfig {
    let mut cfg = WardenConfig::default();
    cfg.storage.registry = dir.join("known-hosts.csv");
    cfg.storage.ledger = dir.join("last_notified.json");
    cfg.storage.poll_mark = dir.join("last_email_checked.txt");
    cfg.replies.enabled = replies;
    cfg
}

fn device1() -> HostObservation {
    HostObservation::new("00:11:22:33:44:55", "192.168.1.2", "Device1")
}

#[test]
fn new_host_is_notified_once_per_cooldown() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), false);
    let notifier = RecordingNotifier::default();
    let warden = Warden::new(
        cfg.clone(),
        FakeScanner(Ok(vec![device1()])),
        &notifier,
        FakeReplies::default(),
    );

    let first = warden.run(now()).unwrap();
    assert_eq!(first.notified, ["00:11:22:33:44:55"]);
    assert!(first.notification_sent);

    let second = warden.run(now() + Duration::hours(2)).unwrap();
    assert!(second.notified.is_empty());

    let third = warden.run(now() + Duration::days(2)).unwrap();
    assert_eq!(third.notified, ["00:11:22:33:44:55"]);

    let sent = notifier.sent.borrow();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "New Device Detected on LAN");
    assert!(sent[0].1.contains("00:11:22:33:44:55, 192.168.1.2, Device1"));
    assert_eq!(sent[0].2.as_ref().unwrap().filename, "known-hosts.csv");

    let ledger = Ledger::load(&cfg.storage.ledger).unwrap();
    assert_eq!(
        ledger.get("00:11:22:33:44:55"),
        Some(now() + Duration::days(2))
    );
}

#[test]
fn reply_command_approves_host_and_clears_ledger_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true);
    let observed = HostObservation::new("00:AA:22:33:44:55", "192.168.1.2", "Device1");

    let mut ledger = Ledger::new();
    ledger.upsert("00:aa:22:33:44:55", now() - Duration::minutes(30));
    ledger.save(&cfg.storage.ledger).unwrap();

    let replies = FakeReplies {
        messages: vec![(
            "Re: New Device Detected on LAN".to_string(),
            "add 00:AA:22:33:44:55".to_string(),
        )],
        ..FakeReplies::default()
    };
    let notifier = RecordingNotifier::default();
    let warden = Warden::new(
        cfg.clone(),
        FakeScanner(Ok(vec![observed])),
        &notifier,
        &replies,
    );

    let report = warden.run(now()).unwrap();
    assert!(report.notified.is_empty());
    assert!(report.polled);
    assert_eq!(report.added, ["00:aa:22:33:44:55"]);
    assert!(notifier.sent.borrow().is_empty());

    let registry = Registry::load(&cfg.storage.registry).unwrap();
    let entry = registry.get("00:aa:22:33:44:55").unwrap();
    assert_eq!(entry.network_address, "192.168.1.2");
    assert_eq!(entry.label, "Device1");

    // The poll gate is now closed; the next run only reconciles.
    let next = warden.run(now() + Duration::hours(1)).unwrap();
    assert!(!next.polled);
    assert_eq!(*replies.calls.borrow(), 1);
    let ledger = Ledger::load(&cfg.storage.ledger).unwrap();
    assert!(!ledger.contains("00:aa:22:33:44:55"));
}

#[test]
fn known_host_gets_new_address() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), false);
    std::fs::write(
        &cfg.storage.registry,
        "# my devices\n00:11:22:33:44:55,192.168.1.9,Device1\n",
    )
    .unwrap();

    let warden = Warden::new(
        cfg.clone(),
        FakeScanner(Ok(vec![device1()])),
        RecordingNotifier::default(),
        FakeReplies::default(),
    );
    let report = warden.run(now()).unwrap();

    assert_eq!(report.readdressed, ["00:11:22:33:44:55"]);
    assert_eq!(
        std::fs::read_to_string(&cfg.storage.registry).unwrap(),
        "# my devices\n00:11:22:33:44:55,192.168.1.2,Device1\n"
    );
}

#[test]
fn scanner_and_notifier_failures_do_not_abort() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), false);

    let failing_scan = Warden::new(
        cfg.clone(),
        FakeScanner(Err("arp-scan: permission denied".into())),
        RecordingNotifier::default(),
        FakeReplies::default(),
    );
    let report = failing_scan.run(now()).unwrap();
    assert_eq!(report.observed, 0);

    let notifier = RecordingNotifier {
        fail: true,
        ..RecordingNotifier::default()
    };
    let failing_send = Warden::new(
        cfg.clone(),
        FakeScanner(Ok(vec![device1()])),
        &notifier,
        FakeReplies::default(),
    );
    let report = failing_send.run(now()).unwrap();
    assert_eq!(report.notified.len(), 1);
    assert!(!report.notification_sent);
    assert!(Ledger::load(&cfg.storage.ledger)
        .unwrap()
        .contains("00:11:22:33:44:55"));
}

#[test]
fn malformed_ledger_aborts_before_anything_is_sent() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), false);
    std::fs::write(&cfg.storage.ledger, "{not json").unwrap();

    let notifier = RecordingNotifier::default();
    let warden = Warden::new(
        cfg.clone(),
        FakeScanner(Ok(vec![device1()])),
        &notifier,
        FakeReplies::default(),
    );

    let err = warden.run(now()).unwrap_err();
    assert!(matches!(err, WardenError::MalformedLedger { .. }));
    assert!(notifier.sent.borrow().is_empty());
    assert!(!cfg.storage.registry.exists());
    assert_eq!(
        std::fs::read_to_string(&cfg.storage.ledger).unwrap(),
        "{not json"
    );
}

#[test]
fn replies_are_not_read_when_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), false);
    let replies = FakeReplies::default();
    let warden = Warden::new(
        cfg.clone(),
        FakeScanner(Ok(vec![])),
        RecordingNotifier::default(),
        &replies,
    );

    let report = warden.run(now()).unwrap();

    assert!(!report.polled);
    assert_eq!(*replies.calls.borrow(), 0);
    assert!(!cfg.storage.poll_mark.exists());
}

#[test]
fn failed_reply_fetch_leaves_poll_due() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true);
    let replies = FakeReplies {
        fail: true,
        ..FakeReplies::default()
    };
    let warden = Warden::new(
        cfg.clone(),
        FakeScanner(Ok(vec![device1()])),
        RecordingNotifier::default(),
        &replies,
    );

    let report = warden.run(now()).unwrap();
    assert!(!report.polled);
    assert!(report.added.is_empty());
    assert!(!cfg.storage.poll_mark.exists());
    assert!(Ledger::load(&cfg.storage.ledger)
        .unwrap()
        .contains("00:11:22:33:44:55"));

    let next = warden.run(now() + Duration::minutes(10)).unwrap();
    assert!(!next.polled);
    assert_eq!(*replies.calls.borrow(), 2);
}

#[test]
fn malformed_poll_mark_aborts_before_anything_is_sent() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true);
    std::fs::write(&cfg.storage.poll_mark, "soon").unwrap();

    let notifier = RecordingNotifier::default();
    let replies = FakeReplies::default();
    let warden = Warden::new(
        cfg.clone(),
        FakeScanner(Ok(vec![device1()])),
        &notifier,
        &replies,
    );

    let err = warden.run(now()).unwrap_err();
    assert!(matches!(err, WardenError::MalformedPollMark { .. }));
    assert!(notifier.sent.borrow().is_empty());
    assert_eq!(*replies.calls.borrow(), 0);
    assert!(!cfg.storage.ledger.exists());
    assert!(!cfg.storage.registry.exists());
}

#[test]
fn malformed_registry_aborts_before_anything_is_sent() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), false);
    let registry = "# my devices\n00:11:22:33:44:55,192.168.1.2\n";
    std::fs::write(&cfg.storage.registry, registry).unwrap();

    let notifier = RecordingNotifier::default();
    let warden = Warden::new(
        cfg.clone(),
        FakeScanner(Ok(vec![device1()])),
        &notifier,
        FakeReplies::default(),
    );

    let err = warden.run(now()).unwrap_err();
    assert!(matches!(err, WardenError::MalformedRegistry { line: 2, .. }));
    assert!(notifier.sent.borrow().is_empty());
    assert!(!cfg.storage.ledger.exists());
    assert_eq!(
        std::fs::read_to_string(&cfg.storage.registry).unwrap(),
        registry
    );
}
