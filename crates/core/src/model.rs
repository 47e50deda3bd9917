use serde::{Deserialize, Serialize};

use crate::key::normalize;

/// Placeholder for a network address or label that is not known yet.
pub const UNKNOWN: &str = "unknown";

/// One host seen by the scanner during the current run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostObservation {
    pub key: String,
    /// Hardware address as reported by the scanner
    pub address: String,
    pub network_address: String,
    pub label: String,
}

impl HostObservation {
    pub fn new(
        address: impl Into<String>,
        network_address: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        let address = address.into();
        Self {
            key: normalize(&address),
            address,
            network_address: network_address.into(),
            label: label.into(),
        }
    }
}

/// An approved host, one line of the registry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub key: String,
    pub address: String,
    pub network_address: String,
    pub label: String,
}

impl RegistryEntry {
    /// Builds an entry, stripping commas from the fields so the entry
    /// always renders as a single three-field line.
    pub fn new(address: &str, network_address: &str, label: &str) -> Self {
        let address = strip_separators(address);
        Self {
            key: normalize(&address),
            address,
            network_address: strip_separators(network_address),
            label: strip_separators(label),
        }
    }

    /// Entry for a host approved through a reply command. Network address and
    /// label come from this run's observation when the host is online.
    pub fn approved(key: &str, observation: Option<&HostObservation>) -> Self {
        match observation {
            Some(obs) => Self::new(key, &obs.network_address, &obs.label),
            None => Self::new(key, UNKNOWN, UNKNOWN),
        }
    }

    /// Replaces the network address, sanitized like [`RegistryEntry::new`].
    /// Returns whether the stored value changed.
    pub fn set_network_address(&mut self, network_address: &str) -> bool {
        let network_address = strip_separators(network_address);
        if network_address == self.network_address {
            return false;
        }
        self.network_address = network_address;
        true
    }

    /// `mac,ip,hostname`
    pub fn to_line(&self) -> String {
        format!("{},{},{}", self.address, self.network_address, self.label)
    }
}

fn strip_separators(value: &str) -> String {
    value.trim().replace(',', "")
}
