#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;

const OVERRIDES: &[&str] = &[
    "KNOWN_HOSTS",
    "LAST_NOTIFIED_FILE",
    "EMAIL_CHECK_FILE",
    "NOTIFY_INTERVAL",
    "EMAIL_CHECK_INTERVAL",
    "EMAIL_RECEPIENT",
    "EMAIL_USERNAME",
    "MAILDIR_PATH",
    "ENABLE_MAIL_RESPONSE_DEVICE_ADDING",
];

/// Config with a fake scanner that reports one host and a notifier that
/// writes the message to `sent.eml`.
fn write_config(dir: &Path, registry: &str) {
    let cfg = format!(
        r#"
[storage]
registry = "{registry}"
ledger = "last_notified.json"
poll_mark = "last_email_checked.txt"

[notification]
recipient = "ops@example.org"

[scanner]
command = ["sh", "-c", "printf '192.168.1.2\\t00:11:22:33:44:55\\tDevice1\\n'"]

[notifier]
command = ["sh", "-c", "cat > sent.eml", "sh"]

[replies]
enabled = true
maildir = "mail"
"#
    );
    std::fs::write(dir.join("lanwarden.toml"), cfg).unwrap();
}

fn lanwarden(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lanwarden").unwrap();
    for name in OVERRIDES {
        cmd.env_remove(name);
    }
    cmd.current_dir(dir)
        .env("LANWARDEN_CONFIG", dir.join("lanwarden.toml"))
        .env("RUST_LOG", "info")
        .timeout(Duration::from_secs(30));
    cmd
}

#[test]
fn first_run_notifies_and_persists_state() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "known-hosts.csv");
    std::fs::create_dir(dir.path().join("mail")).unwrap();

    lanwarden(dir.path()).assert().success();

    let sent = std::fs::read_to_string(dir.path().join("sent.eml")).unwrap();
    assert!(sent.contains("Subject: New Device Detected on LAN"));
    assert!(sent.contains("00:11:22:33:44:55, 192.168.1.2, Device1"));

    let registry = std::fs::read_to_string(dir.path().join("known-hosts.csv")).unwrap();
    assert_eq!(registry, "# mac,ip,hostname\n");

    let ledger = std::fs::read_to_string(dir.path().join("last_notified.json")).unwrap();
    assert!(ledger.contains("00:11:22:33:44:55"));
    assert!(dir.path().join("last_email_checked.txt").exists());
}

#[test]
fn reply_in_maildir_approves_host() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "known-hosts.csv");
    let mail = dir.path().join("mail");
    std::fs::create_dir(&mail).unwrap();
    std::fs::write(
        mail.join("1700000000.reply"),
        "From: Ops <ops@example.org>\nSubject: Re: New Device Detected on LAN\n\nadd 00:11:22:33:44:55\n",
    )
    .unwrap();

    lanwarden(dir.path()).assert().success();

    let registry = std::fs::read_to_string(dir.path().join("known-hosts.csv")).unwrap();
    assert_eq!(
        registry,
        "# mac,ip,hostname\n00:11:22:33:44:55,192.168.1.2,Device1\n"
    );
}

#[test]
fn second_run_inside_cooldown_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "known-hosts.csv");
    std::fs::create_dir(dir.path().join("mail")).unwrap();

    lanwarden(dir.path()).assert().success();
    std::fs::remove_file(dir.path().join("sent.eml")).unwrap();

    lanwarden(dir.path()).assert().success();
    assert!(!dir.path().join("sent.eml").exists());
}

#[test]
fn malformed_ledger_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "known-hosts.csv");
    std::fs::write(dir.path().join("last_notified.json"), "{\"00:11:22:33:44:55\": 5}").unwrap();

    lanwarden(dir.path())
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("malformed ledger"));
    assert!(!dir.path().join("sent.eml").exists());
}

#[test]
fn uncreatable_registry_fails_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("blocker"), "not a directory").unwrap();
    write_config(dir.path(), "blocker/known-hosts.csv");

    lanwarden(dir.path())
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unable to create registry file"));
}

#[test]
fn invalid_config_exits_with_configuration_status() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("lanwarden.toml"),
        "[notification]\nsubject = \"\"\n",
    )
    .unwrap();

    lanwarden(dir.path())
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("notification.subject must not be empty"));
    assert!(!dir.path().join("known-hosts.csv").exists());
}
