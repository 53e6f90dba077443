use std::path::Path;

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest.
pub const FINGERPRINT_LEN: usize = 32;

/// Stable identifier for a `(source, target, folder)` triple.
///
/// SHA-256 over the three fields, each followed by a NUL separator,
/// truncated to the first 32 hex characters. Recomputable from any
/// request, so a request can be matched to a stored decision without
/// keeping the triple as the key.
pub fn fingerprint(source: &str, target: &str, folder: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\0");
    hasher.update(target.as_bytes());
    hasher.update(b"\0");
    hasher.update(folder.to_string_lossy().as_bytes());
    hasher.update(b"\0");
    let digest = hex::encode(hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}
