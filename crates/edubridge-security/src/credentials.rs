/// Credential values that ship in sample `.env` files and must never be sent.
pub const PLACEHOLDER_CREDENTIALS: &[&str] = &["hf_...", "sk-...", "your-api-key", "changeme"];

/// True when `value` looks like a real credential rather than a blank or a
/// template placeholder.
pub fn is_usable_credential(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !PLACEHOLDER_CREDENTIALS.contains(&trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_keys_are_usable() {
        assert!(is_usable_credential("gsk_live_0123456789"));
        assert!(is_usable_credential("  hf_abcdef  "));
    }

    #[test]
    fn blanks_and_placeholders_are_rejected() {
        assert!(!is_usable_credential(""));
        assert!(!is_usable_credential("   "));
        assert!(!is_usable_credential("hf_..."));
        assert!(!is_usable_credential(" sk-... "));
        assert!(!is_usable_credential("changeme"));
    }
}
