// # -----------------------------
// # crates/cli/src/main.rs
// # -----------------------------
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use lanwarden_cli::{ArpScanScanner, MaildirReplies, SendmailNotifier};
use lanwarden_core::{Registry, Warden, WardenConfig, WardenError};

/// Scan the LAN once, notify about unknown hosts, apply reply commands.
///
/// Meant to be scheduled (cron, systemd timer); runs never overlap.
#[derive(Parser, Debug)]
#[command(name = "lanwarden", version, about = "Notify about unknown hosts on the LAN")]
struct Cli {}

/// Logging goes through `RUST_LOG`, `info` when unset.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
    let _cli = Cli::parse();
    init_logging();

    if let Err(err) = run() {
        let code = match warden_error(&err) {
            Some(cause) => {
                tracing::error!(
                    "{:?} failure on {}",
                    cause.category(),
                    cause.path().display()
                );
                cause.category().exit_code()
            }
            None => 1,
        };
        eprintln!("Error: {:?}", err);
        std::process::exit(code);
    }
}

/// First [`WardenError`] in the cause chain, below any added context.
fn warden_error(err: &anyhow::Error) -> Option<&WardenError> {
    err.chain().find_map(|cause| cause.downcast_ref::<WardenError>())
}

fn run() -> Result<()> {
    tracing::info!("starting lanwarden scan");

    let cfg = WardenConfig::from_env().context("load config")?;
    tracing::debug!("configuration: {:?}", cfg);

    Registry::ensure_exists(&cfg.storage.registry).with_context(|| {
        format!(
            "unable to create registry file {}",
            cfg.storage.registry.display()
        )
    })?;

    let scanner = ArpScanScanner::new(cfg.scanner.command.clone());
    let notifier = SendmailNotifier::from_config(&cfg);
    let replies = MaildirReplies::from_config(&cfg);
    let warden = Warden::new(cfg, scanner, notifier, replies);

    let report = warden.run(Utc::now()).context("lanwarden run failed")?;

    tracing::info!(
        "scan finished: {} hosts observed, {} notified, {} approved, {} re-addressed{}",
        report.observed,
        report.notified.len(),
        report.added.len(),
        report.readdressed.len(),
        if report.polled { ", replies checked" } else { "" }
    );
    Ok(())
}
