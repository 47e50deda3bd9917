//! # Registry Store
//!
//! The approve-list of known hosts. On disk it is a line oriented text file
//! with one `mac,ip,hostname` line per approved host. `#` comment lines are
//! kept verbatim and stay where they were relative to the entries; blank
//! lines are dropped.
//!
//! The registry is read once at the start of a run and rewritten in full at
//! the end, after reply commands and address refreshes have been merged in.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use tracing::{info, warn};

use crate::errors::{WardenError, WardenResult};
use crate::fs::AtomicFile;
use crate::model::{HostObservation, RegistryEntry};

/// Comment written at the top of a freshly created registry.
pub const REGISTRY_HEADER: &str = "# mac,ip,hostname";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    /// Comment lines with the number of entries that precede them
    comments: Vec<(usize, String)>,
    entries: Vec<RegistryEntry>,
}

/// What [`Registry::apply`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryChanges {
    /// Keys approved through reply commands this run
    pub added: Vec<String>,
    /// Keys whose network address was refreshed from an observation
    pub readdressed: Vec<String>,
}

impl RegistryChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.readdressed.is_empty()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the registry file with a comment header if it does not exist.
    pub fn ensure_exists(path: &Path) -> WardenResult<()> {
        if path.exists() {
            return Ok(());
        }
        info!("creating registry file {}", path.display());
        AtomicFile::write_text(path, &format!("{}\n", REGISTRY_HEADER))
    }

    /// Loads the registry at `path`. A missing file is an empty registry.
    pub fn load(path: &Path) -> WardenResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(WardenError::io(path, "read", e)),
        };

        Self::parse(&raw).map_err(|(line, reason)| WardenError::MalformedRegistry {
            path: path.to_path_buf(),
            line,
            reason,
        })
    }

    /// Parses the text form. Errors carry the 1-based line number.
    pub fn parse(raw: &str) -> Result<Self, (usize, String)> {
        let mut registry = Self::new();

        for (idx, line) in raw.lines().enumerate() {
            if line.trim_start().starts_with('#') {
                registry
                    .comments
                    .push((registry.entries.len(), line.to_string()));
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let [address, network_address, label] = fields.as_slice() else {
                return Err((
                    idx + 1,
                    format!("expected 3 comma separated fields, found {}", fields.len()),
                ));
            };
            if address.is_empty() {
                return Err((idx + 1, "empty hardware address".to_string()));
            }

            let entry = RegistryEntry::new(address, network_address, label);
            if !registry.append(entry) {
                warn!(
                    "registry line {} repeats host {}, keeping the first entry",
                    idx + 1,
                    address
                );
            }
        }

        Ok(registry)
    }

    /// One line per entry with the comments at their original position,
    /// newline terminated. Entries added since loading come last.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut comments = self.comments.iter().peekable();
        for (idx, entry) in self.entries.iter().enumerate() {
            while let Some((_, line)) = comments.next_if(|(pos, _)| *pos <= idx) {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(&entry.to_line());
            out.push('\n');
        }
        for (_, line) in comments {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    pub fn save(&self, path: &Path) -> WardenResult<()> {
        AtomicFile::write_text(path, &self.render())
    }

    /// Appends `entry` unless its key is already registered.
    pub fn append(&mut self, entry: RegistryEntry) -> bool {
        if self.contains(&entry.key) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn keys(&self) -> HashSet<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.comments.iter().map(|(_, line)| line.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges reply-approved hosts and refreshed network addresses.
    ///
    /// Authorized keys not yet registered become new entries, filled from
    /// this run's observation when there is one. Existing entries whose host
    /// was observed under a different network address get that address;
    /// labels are never touched here.
    pub fn apply(
        &mut self,
        authorized: &BTreeSet<String>,
        observations: &[HostObservation],
    ) -> RegistryChanges {
        let observed: HashMap<&str, &HostObservation> = observations
            .iter()
            .map(|obs| (obs.key.as_str(), obs))
            .collect();
        let mut changes = RegistryChanges::default();

        for key in authorized {
            if self.contains(key) {
                continue;
            }
            let entry = RegistryEntry::approved(key, observed.get(key.as_str()).copied());
            info!("approving host {} ({}, {})", key, entry.network_address, entry.label);
            self.entries.push(entry);
            changes.added.push(key.clone());
        }

        for entry in &mut self.entries {
            let Some(obs) = observed.get(entry.key.as_str()) else {
                continue;
            };
            let previous = entry.network_address.clone();
            if entry.set_network_address(&obs.network_address) {
                info!(
                    "host {} moved from {} to {}",
                    entry.key, previous, entry.network_address
                );
                changes.readdressed.push(entry.key.clone());
            }
        }

        changes
    }
}
