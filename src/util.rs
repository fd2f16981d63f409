//! Shared utility functions

use sha2::{Digest, Sha256};

/// Cap a string at `max_bytes` on a UTF-8 boundary, marking the cut with "…"
///
/// Used for upstream error bodies, which can be arbitrarily large HTML pages.
pub fn truncate_for_detail(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

/// Short SHA-256 fingerprint of a secret, safe to log
///
/// Lets operators correlate requests made with the same key without the key
/// itself ever reaching a log line.
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

/// Mint a request-scoped message id (`msg_` + 24 hex chars)
pub fn generate_message_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("msg_{}", &uuid[..24])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_shorter_than_max() {
        assert_eq!(truncate_for_detail("rate limited", 100), "rate limited");
    }

    #[test]
    fn test_truncate_respects_utf8_boundary() {
        // Each character is 3 bytes; a cut at 4 must back off to 3
        assert_eq!(truncate_for_detail("日本語", 4), "日…");
        assert_eq!(truncate_for_detail("日本語", 6), "日本…");
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = fingerprint("sk-test-123");
        assert_eq!(a.len(), 16);
        assert_eq!(a, fingerprint("sk-test-123"));
        assert_ne!(a, fingerprint("sk-test-124"));
        assert!(!a.contains("sk-"));
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = generate_message_id();
        let b = generate_message_id();
        assert!(a.starts_with("msg_"));
        assert_eq!(a.len(), 28);
        assert_ne!(a, b);
    }
}
