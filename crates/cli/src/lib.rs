//! # Lanwarden CLI Library
//!
//! Concrete collaborators for the core engine: an `arp-scan` scanner, a
//! sendmail-compatible notifier and a maildir reply source.

pub mod backends;

pub use backends::{ArpScanScanner, MaildirReplies, SendmailNotifier};
