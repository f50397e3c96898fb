//! Content-addressed cache keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::errors::CacheError;

/// SHA-256 hex digest identifying one operation call.
///
/// The digest covers the operation name and the canonical JSON form of the
/// arguments. Object keys are sorted before hashing, so argument maps built
/// in different insertion orders hash the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for `op` called with `args`.
    pub fn derive<A>(op: &str, args: &A) -> Result<Self, CacheError>
    where
        A: Serialize + ?Sized,
    {
        let canonical = serde_json::to_string(&serde_json::to_value(args)?)?;
        let mut hasher = Sha256::new();
        hasher.update(op.as_bytes());
        hasher.update(b":");
        hasher.update(canonical.as_bytes());
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
