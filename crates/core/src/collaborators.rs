//! Seams to the outside world: network scan, notification transport and the
//! reply mailbox. Implementations live in the binary crate; tests use
//! in-memory fakes.

use anyhow::Result;

use crate::model::HostObservation;

/// File attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub trait Scanner {
    /// Hosts currently present on the network.
    fn scan(&self) -> Result<Vec<HostObservation>>;
}

pub trait Notifier {
    fn notify(&self, subject: &str, body: &str, attachment: Option<&Attachment>) -> Result<()>;
}

pub trait ReplySource {
    /// `(subject, body)` pairs of messages that may answer a notification.
    fn fetch_replies(&self) -> Result<Vec<(String, String)>>;
}

impl<T: Scanner + ?Sized> Scanner for &T {
    fn scan(&self) -> Result<Vec<HostObservation>> {
        (**self).scan()
    }
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn notify(&self, subject: &str, body: &str, attachment: Option<&Attachment>) -> Result<()> {
        (**self).notify(subject, body, attachment)
    }
}

impl<T: ReplySource + ?Sized> ReplySource for &T {
    fn fetch_replies(&self) -> Result<Vec<(String, String)>> {
        (**self).fetch_replies()
    }
}
