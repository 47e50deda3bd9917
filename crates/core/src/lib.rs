// # -----------------------------
// # crates/core/src/lib.rs
// # -----------------------------
//! # Lanwarden Core
//!
//! Presence reconciliation and notification throttling for hosts seen on a
//! local network, plus the reply-command channel that lets an operator
//! approve hosts by answering a notification.

pub mod collaborators;
pub mod commands;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod key;
pub mod ledger;
pub mod model;
pub mod notification;
pub mod poll_gate;
pub mod reconcile;
pub mod registry;

// Re-export core types for convenience
pub use collaborators::{Attachment, Notifier, ReplySource, Scanner};
pub use commands::CommandExtractor;
pub use config::WardenConfig;
pub use engine::{RunReport, Warden};
pub use errors::{ErrorCategory, WardenError, WardenResult};
pub use key::normalize;
pub use ledger::Ledger;
pub use model::{HostObservation, RegistryEntry, UNKNOWN};
pub use poll_gate::PollGate;
pub use reconcile::reconcile;
pub use registry::{Registry, RegistryChanges};
