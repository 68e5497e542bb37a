//! Content fingerprints.

use std::hash::Hasher;

use rustc_hash::FxHasher;

/// Fingerprint of an artifact's bytes.
pub fn fingerprint(content: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(content);
    hasher.write_usize(content.len());
    hasher.finish()
}

/// Fold dependency fingerprints into `own`, order-sensitive.
pub fn combine(own: u64, dependencies: impl IntoIterator<Item = u64>) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u64(own);
    for dependency in dependencies {
        hasher.write_u64(dependency);
    }
    hasher.finish()
}
