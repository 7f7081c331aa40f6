//! Content digests for operation-graph entries.
//!
//! Every marshalled operation is identified by the SHA-256 of its JSON
//! serialization. Identical operations therefore share a digest, which lets
//! the definition deduplicate them.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

pub type HashError = serde_json::Error;

/// A `sha256:<hex>` digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Digest(pub String);

impl std::fmt::Display for Digest {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Digest {
  /// Hex part of the digest, without the algorithm prefix.
  pub fn hex(&self) -> &str {
    self.0.strip_prefix("sha256:").unwrap_or(&self.0)
  }
}

pub trait Hashable: Serialize {
  fn compute_digest(&self) -> Result<Digest, HashError> {
    let serialized = serde_json::to_vec(self)?;
    Ok(digest_bytes(&serialized))
  }
}

pub fn digest_bytes(data: &[u8]) -> Digest {
  let mut hasher = Sha256::new();
  hasher.update(data);
  Digest(format!("sha256:{}", hex::encode(hasher.finalize())))
}
