use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of a byte buffer
pub fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Get current timestamp in the compact, lexicographically sortable form
/// used for backup directory names
pub fn now_compact() -> String {
    chrono::Utc::now().format("%Y%m%d%H%M%S%3f").to_string()
}
