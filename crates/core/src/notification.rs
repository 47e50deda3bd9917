//! Rendering of the per-run batch notification.

use std::path::Path;

use crate::collaborators::Attachment;
use crate::config::NotificationCfg;
use crate::model::HostObservation;
use crate::registry::Registry;

/// One line per host, using `{mac}`, `{ip}` and `{hostname}` placeholders.
pub fn render_host_line(template: &str, host: &HostObservation) -> String {
    template
        .replace("{mac}", &host.address)
        .replace("{ip}", &host.network_address)
        .replace("{hostname}", &host.label)
}

/// Body of the notification: prefix, flagged hosts, postfix.
pub fn render_body(cfg: &NotificationCfg, hosts: &[HostObservation]) -> String {
    let lines: Vec<String> = hosts
        .iter()
        .map(|h| render_host_line(&cfg.line_template, h))
        .collect();
    format!("{}\n{}\n{}\n", cfg.prefix, lines.join("\n"), cfg.postfix)
}

/// The current registry, attached so the operator can see what is approved.
pub fn registry_attachment(registry: &Registry, registry_path: &Path) -> Attachment {
    let filename = registry_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "known-hosts.csv".to_string());
    Attachment {
        filename,
        content_type: "text/csv".to_string(),
        bytes: registry.render().into_bytes(),
    }
}
