//! # Run Orchestration
//!
//! One run: load state, scan, reconcile, notify, optionally read reply
//! commands, merge them into the registry, persist.
//!
//! All persisted state is read before any collaborator is called, so a
//! malformed state file aborts the run before anything is sent or written.
//! Collaborator failures are logged and treated as empty results.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::collaborators::{Notifier, ReplySource, Scanner};
use crate::commands::CommandExtractor;
use crate::config::WardenConfig;
use crate::errors::WardenResult;
use crate::ledger::Ledger;
use crate::notification::{registry_attachment, render_body};
use crate::poll_gate::PollGate;
use crate::reconcile::reconcile;
use crate::registry::Registry;

/// Outcome of a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Hosts returned by the scanner
    pub observed: usize,
    /// Keys included in this run's notification
    pub notified: Vec<String>,
    /// Whether the notifier accepted the notification
    pub notification_sent: bool,
    /// Whether the reply channel was queried successfully
    pub polled: bool,
    /// Keys approved through reply commands
    pub added: Vec<String>,
    /// Registered keys whose network address changed
    pub readdressed: Vec<String>,
}

pub struct Warden<S, N, R> {
    config: WardenConfig,
    scanner: S,
    notifier: N,
    replies: R,
}

impl<S, N, R> Warden<S, N, R>
where
    S: Scanner,
    N: Notifier,
    R: ReplySource,
{
    pub fn new(config: WardenConfig, scanner: S, notifier: N, replies: R) -> Self {
        Self {
            config,
            scanner,
            notifier,
            replies,
        }
    }

    pub fn run(&self, now: DateTime<Utc>) -> WardenResult<RunReport> {
        let storage = &self.config.storage;
        let mut registry = Registry::load(&storage.registry)?;
        let mut ledger = Ledger::load(&storage.ledger)?;
        let gate = PollGate::new(&storage.poll_mark, self.config.cooldown.poll_interval());
        let poll_due = self.config.replies.enabled && gate.should_poll(now)?;

        info!(
            "loaded {} registered hosts and {} ledger entries",
            registry.len(),
            ledger.len()
        );

        let observations = match self.scanner.scan() {
            Ok(found) => found,
            Err(e) => {
                warn!("network scan failed, continuing with no observations: {:#}", e);
                Vec::new()
            }
        };
        let mut report = RunReport {
            observed: observations.len(),
            ..RunReport::default()
        };

        let flagged = reconcile(
            &observations,
            &registry,
            &mut ledger,
            now,
            self.config.cooldown.notify_interval(),
        );
        report.notified = flagged.iter().map(|h| h.key.clone()).collect();

        if flagged.is_empty() {
            info!("no new hosts detected");
        } else {
            info!("new hosts detected: {:?}", report.notified);
            let cfg = &self.config.notification;
            let body = render_body(cfg, &flagged);
            let attachment = registry_attachment(&registry, &storage.registry);
            match self.notifier.notify(&cfg.subject, &body, Some(&attachment)) {
                Ok(()) => report.notification_sent = true,
                Err(e) => warn!("failed to send notification: {:#}", e),
            }
        }

        let mut authorized = BTreeSet::new();
        if poll_due {
            info!("checking replies for hosts to approve");
            match self.replies.fetch_replies() {
                Ok(messages) => {
                    let extractor = CommandExtractor::new(&self.config.notification.subject);
                    authorized =
                        extractor.extract(messages.iter().map(|(s, b)| (s.as_str(), b.as_str())));
                    report.polled = true;
                }
                Err(e) => warn!("failed to read replies: {:#}", e),
            }
        }

        let changes = registry.apply(&authorized, &observations);
        report.added = changes.added;
        report.readdressed = changes.readdressed;

        ledger.save(&storage.ledger)?;
        registry.save(&storage.registry)?;
        if report.polled {
            gate.record_poll(now)?;
        }

        Ok(report)
    }
}
