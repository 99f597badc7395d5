//! Content digests for archived artifacts.

use sha2::{Digest, Sha256};

pub fn artifact_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
