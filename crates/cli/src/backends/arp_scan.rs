use std::collections::HashSet;
use std::process::Command;

use anyhow::{bail, Context, Result};
use lanwarden_core::{HostObservation, Scanner, UNKNOWN};
use tracing::debug;

/// Runs `arp-scan -l` (or any command with the same output format) and
/// reads `ip<TAB>mac<TAB>vendor` lines from its output.
pub struct ArpScanScanner {
    command: Vec<String>,
}

impl ArpScanScanner {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Scanner for ArpScanScanner {
    fn scan(&self) -> Result<Vec<HostObservation>> {
        let (program, args) = self
            .command
            .split_first()
            .context("scanner command is empty")?;

        debug!("running scanner: {:?}", self.command);
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to spawn '{}'", program))?;

        if !output.status.success() {
            bail!(
                "'{}' exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(parse_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses scanner output. Lines without a tab (banners, summaries) are
/// skipped, and a host reported twice is kept once.
pub fn parse_output(stdout: &str) -> Vec<HostObservation> {
    let mut seen = HashSet::new();
    let mut hosts = Vec::new();

    for line in stdout.lines() {
        if !line.contains('\t') {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').map(str::trim).collect();
        let (Some(ip), Some(mac)) = (parts.first(), parts.get(1)) else {
            continue;
        };
        let label = parts
            .get(2)
            .copied()
            .filter(|l| !l.is_empty())
            .unwrap_or(UNKNOWN);

        let host = HostObservation::new(mac.to_lowercase(), *ip, label);
        if seen.insert(host.key.clone()) {
            hosts.push(host);
        }
    }

    hosts
}
