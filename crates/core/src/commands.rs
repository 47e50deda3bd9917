//! # Reply Commands
//!
//! Turns replies to our own notifications into registry additions. A reply
//! body may carry any number of `add <mac>` instructions; everything else in
//! the mailbox is ignored without complaint.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::key::normalize;

/// Prefix mail clients put in front of the subject they reply to.
pub const REPLY_PREFIX: &str = "Re: ";

// `add`, whitespace, then exactly six hex pairs. A trailing colon is fine as
// punctuation but not when another hex digit follows it.
static ADD_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\badd\s+([0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5})(?:$|[^0-9A-Fa-f:]|:(?:$|[^0-9A-Fa-f]))",
    )
    .expect("add command pattern is valid")
});

#[derive(Debug, Clone)]
pub struct CommandExtractor {
    subject: String,
}

impl CommandExtractor {
    /// `subject` is the subject line used for outgoing notifications.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    /// True when `subject` contains `Re: <notification subject>`. The prefix
    /// is matched case-sensitively, the original subject case-insensitively.
    pub fn is_reply(&self, subject: &str) -> bool {
        let expected = self.subject.to_lowercase();
        subject.match_indices(REPLY_PREFIX).any(|(idx, prefix)| {
            subject[idx + prefix.len()..]
                .to_lowercase()
                .starts_with(&expected)
        })
    }

    /// Addresses found in `add <mac>` instructions of one body, normalized.
    pub fn addresses_in(body: &str) -> Vec<String> {
        ADD_COMMAND
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .map(|m| normalize(m.as_str()))
            .collect()
    }

    /// Every address to approve across `messages`, as `(subject, body)` pairs.
    pub fn extract<'a, I>(&self, messages: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut found = BTreeSet::new();
        for (subject, body) in messages {
            if !self.is_reply(subject) {
                debug!("ignoring message '{}', not a reply to a notification", subject);
                continue;
            }
            let addresses = Self::addresses_in(body);
            if !addresses.is_empty() {
                info!("reply '{}' asks to add {:?}", subject, addresses);
            }
            found.extend(addresses);
        }
        found
    }
}
