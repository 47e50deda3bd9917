use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use lanwarden_core::{Attachment, Notifier, WardenConfig};
use tracing::{debug, info};

/// Pipes an RFC 5322 message into a sendmail-compatible command such as
/// `msmtp`, with the recipient as last argument.
pub struct SendmailNotifier {
    command: Vec<String>,
    sender: String,
    recipient: String,
}

impl SendmailNotifier {
    pub fn new(command: Vec<String>, sender: String, recipient: String) -> Self {
        Self {
            command,
            sender,
            recipient,
        }
    }

    pub fn from_config(cfg: &WardenConfig) -> Self {
        Self::new(
            cfg.notifier.command.clone(),
            cfg.notification.sender.clone(),
            cfg.notification.recipient.clone(),
        )
    }
}

impl Notifier for SendmailNotifier {
    fn notify(&self, subject: &str, body: &str, attachment: Option<&Attachment>) -> Result<()> {
        if self.recipient.trim().is_empty() {
            bail!("no notification recipient configured");
        }
        let (program, args) = self
            .command
            .split_first()
            .context("notifier command is empty")?;

        let boundary = format!("lanwarden-{}", Utc::now().timestamp_micros());
        let message = build_message(
            &self.sender,
            &self.recipient,
            subject,
            body,
            attachment,
            &boundary,
        );

        debug!("sending notification via {:?}", self.command);
        let mut child = Command::new(program)
            .args(args)
            .arg(&self.recipient)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn '{}'", program))?;

        // stdout and stderr must be drained while the message is written
        let mut stdin = child.stdin.take().context("notifier stdin unavailable")?;
        let writer = std::thread::spawn(move || stdin.write_all(message.as_bytes()));

        let output = child
            .wait_with_output()
            .context("failed to wait for notifier")?;
        let written = writer
            .join()
            .map_err(|_| anyhow!("notifier stdin writer panicked"))?;
        if !output.status.success() {
            bail!(
                "'{}' exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        written.context("failed to write message to notifier")?;

        info!("notification sent to {}", self.recipient);
        Ok(())
    }
}

/// Renders a `multipart/mixed` message when there is an attachment, a plain
/// text one otherwise.
pub fn build_message(
    sender: &str,
    recipient: &str,
    subject: &str,
    body: &str,
    attachment: Option<&Attachment>,
    boundary: &str,
) -> String {
    let mut msg = String::new();
    msg.push_str(&format!("From: {}\r\n", sender));
    msg.push_str(&format!("To: {}\r\n", recipient));
    msg.push_str(&format!("Subject: {}\r\n", subject));
    msg.push_str(&format!("Date: {}\r\n", Utc::now().to_rfc2822()));
    msg.push_str("MIME-Version: 1.0\r\n");

    let text = body.replace("\r\n", "\n").replace('\n', "\r\n");

    let Some(att) = attachment else {
        msg.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        msg.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
        msg.push_str(&text);
        return msg;
    };

    msg.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
        boundary
    ));
    msg.push_str(&format!("--{}\r\n", boundary));
    msg.push_str("Content-Type: text/plain; charset=utf-8\r\n");
    msg.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
    msg.push_str(&text);
    msg.push_str("\r\n");

    msg.push_str(&format!("--{}\r\n", boundary));
    msg.push_str(&format!(
        "Content-Type: {}; name=\"{}\"\r\n",
        att.content_type, att.filename
    ));
    msg.push_str("Content-Transfer-Encoding: base64\r\n");
    msg.push_str(&format!(
        "Content-Disposition: attachment; filename=\"{}\"\r\n\r\n",
        att.filename
    ));
    let encoded = general_purpose::STANDARD.encode(&att.bytes);
    for chunk in encoded.as_bytes().chunks(76) {
        msg.push_str(&String::from_utf8_lossy(chunk));
        msg.push_str("\r\n");
    }
    msg.push_str(&format!("--{}--\r\n", boundary));
    msg
}
