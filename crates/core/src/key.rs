//! Host identity keys.

/// Canonical comparison key for a hardware address: trimmed, lower-case.
///
/// No validation happens here. Addresses coming from the scanner are
/// trusted as-is; addresses parsed out of free text are validated by
/// [`crate::commands::CommandExtractor`] before they reach this function.
pub fn normalize(address: &str) -> String {
    address.trim().to_lowercase()
}
