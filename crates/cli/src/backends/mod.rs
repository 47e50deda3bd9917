pub mod arp_scan;
pub mod maildir;
pub mod mime;
pub mod sendmail;

pub use arp_scan::ArpScanScanner;
pub use maildir::MaildirReplies;
pub use sendmail::SendmailNotifier;
