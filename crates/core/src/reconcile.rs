//! # Reconciliation
//!
//! Decides, for every host seen this run, whether it is new, due for another
//! notification, suppressed by the cooldown, or trusted.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::ledger::Ledger;
use crate::model::HostObservation;
use crate::registry::Registry;

/// Returns the observations to notify about, in observation order, and
/// updates `ledger` in place.
///
/// - unknown host, no ledger entry: stamped with `now`, notified
/// - unknown host, last notified more than `cooldown` ago: re-stamped, notified
/// - unknown host inside the cooldown window: suppressed
/// - registered host: its ledger entry, if any, is dropped so that a later
///   removal from the registry starts again from a clean slate
pub fn reconcile(
    observations: &[HostObservation],
    registry: &Registry,
    ledger: &mut Ledger,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> Vec<HostObservation> {
    let trusted = registry.keys();
    let mut notify = Vec::new();
    let mut cleared = Vec::new();

    for obs in observations {
        let key = obs.key.as_str();

        if trusted.contains(key) {
            if ledger.contains(key) {
                cleared.push(key);
            }
            continue;
        }

        match ledger.get(key) {
            None => {
                debug!("host {} is new", key);
                ledger.upsert(key, now);
                notify.push(obs.clone());
            }
            Some(last) if now - last > cooldown => {
                debug!("host {} last notified at {}, cooldown elapsed", key, last);
                ledger.upsert(key, now);
                notify.push(obs.clone());
            }
            Some(last) => {
                debug!("host {} suppressed, last notified at {}", key, last);
            }
        }
    }

    for key in cleared {
        debug!("host {} is registered, clearing its ledger entry", key);
        ledger.remove(key);
    }

    notify
}
