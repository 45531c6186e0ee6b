//! Content hashing and per-variant hash storage used for cache-busting URLs.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{BundleError, Result};

/// Digest of bundle content rendered as a URL-path-safe token.
pub trait HashAlgorithm: Send + Sync {
  /// Algorithm name.
  fn name(&self) -> &str;

  /// Token for `content`; depends on the content bytes only.
  fn digest(&self, content: &str) -> String;
}

/// SHA-256 rendered as unpadded URL-safe base64.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hash;

impl HashAlgorithm for Sha256Hash {
  fn name(&self) -> &str {
    "sha256"
  }

  fn digest(&self, content: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(content.as_bytes()))
  }
}

/// BLAKE3 rendered as lowercase hex.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3Hash;

impl HashAlgorithm for Blake3Hash {
  fn name(&self) -> &str {
    "blake3"
  }

  fn digest(&self, content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
  }
}

/// Configurable choice of [`HashAlgorithm`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithmKind {
  /// [`Sha256Hash`].
  #[default]
  Sha256,
  /// [`Blake3Hash`].
  Blake3,
}

impl HashAlgorithmKind {
  /// Instantiate the algorithm.
  pub fn algorithm(self) -> Box<dyn HashAlgorithm> {
    match self {
      Self::Sha256 => Box::new(Sha256Hash),
      Self::Blake3 => Box::new(Blake3Hash),
    }
  }
}

type HashKey = (String, Option<String>);

/// Computes and remembers the hash of every built `(bundle, variant key)` pair.
pub struct HashVersioner {
  algorithm: Box<dyn HashAlgorithm>,
  hashes: BTreeMap<HashKey, String>,
}

impl HashVersioner {
  /// Versioner using `algorithm`.
  pub fn new(algorithm: Box<dyn HashAlgorithm>) -> Self {
    Self {
      algorithm,
      hashes: BTreeMap::new(),
    }
  }

  /// Hash `content` without storing it.
  pub fn compute(&self, content: &str) -> String {
    self.algorithm.digest(content)
  }

  /// Hash `content` and store it for `bundle_id`/`variant_key`, returning the token.
  pub fn store(&mut self, bundle_id: &str, variant_key: Option<&str>, content: &str) -> String {
    let hash = self.compute(content);
    self.hashes.insert(
      (bundle_id.to_string(), variant_key.map(str::to_string)),
      hash.clone(),
    );
    hash
  }

  /// Stored token; `None` key is the unvaried artifact.
  pub fn hash_of(&self, bundle_id: &str, variant_key: Option<&str>) -> Option<&str> {
    self
      .hashes
      .get(&(bundle_id.to_string(), variant_key.map(str::to_string)))
      .map(String::as_str)
  }

  /// Tokens stored for the variants of `bundle_id`, excluding the unvaried one.
  pub fn variant_hashes(&self, bundle_id: &str) -> BTreeMap<String, String> {
    self
      .hashes
      .iter()
      .filter(|((id, _), _)| id == bundle_id)
      .filter_map(|((_, key), hash)| key.clone().map(|key| (key, hash.clone())))
      .collect()
  }

  /// Forget every token of `bundle_id`, before a rebuild.
  pub fn clear(&mut self, bundle_id: &str) {
    self.hashes.retain(|(id, _), _| id != bundle_id);
  }

  /// Cache-busting path `/<hash>[.<variant key>]<bundle id>`.
  pub fn url_path(&self, bundle_id: &str, variant_key: Option<&str>) -> Result<String> {
    let hash = self
      .hash_of(bundle_id, variant_key)
      .ok_or_else(|| BundleError::NotBuilt(bundle_id.to_string()))?;
    Ok(match variant_key {
      Some(key) if !key.is_empty() => format!("/{hash}.{key}{bundle_id}"),
      _ => format!("/{hash}{bundle_id}"),
    })
  }
}

impl Default for HashVersioner {
  fn default() -> Self {
    Self::new(Box::new(Sha256Hash))
  }
}

impl std::fmt::Debug for HashVersioner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HashVersioner")
      .field("algorithm", &self.algorithm.name())
      .field("hashes", &self.hashes)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn digests_depend_on_content_only() {
    for algorithm in [HashAlgorithmKind::Sha256, HashAlgorithmKind::Blake3] {
      let algorithm = algorithm.algorithm();
      let first = algorithm.digest("var a = 1;\n");
      assert_eq!(first, algorithm.digest("var a = 1;\n"));
      assert_ne!(first, algorithm.digest("var a = 2;\n"));
      assert!(
        first
          .chars()
          .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
      );
    }
  }

  #[test]
  fn stores_hashes_per_variant() {
    let mut versioner = HashVersioner::default();
    let base = versioner.store("/lib.js", None, "base");
    let ie6 = versioner.store("/lib.js", Some("ie6"), "ie6");

    assert_ne!(base, ie6);
    assert_eq!(versioner.hash_of("/lib.js", None), Some(base.as_str()));
    assert_eq!(versioner.variant_hashes("/lib.js").len(), 1);
    assert_eq!(
      versioner.url_path("/lib.js", Some("ie6")).unwrap(),
      format!("/{ie6}.ie6/lib.js")
    );

    versioner.clear("/lib.js");
    assert!(matches!(
      versioner.url_path("/lib.js", None),
      Err(BundleError::NotBuilt(id)) if id == "/lib.js"
    ));
  }
}
