use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tessera_core::{canonical_json, Digest};
use tessera_crypto::{create_commitment, generate_nonce};

use crate::error::CredentialError;

/// Compressed `NonceHash`: `[hash, nonce]`.
pub type CompressedNonceHash = (Digest, Option<String>);

/// Hash a value under a nonce: `H(canonical(value) || nonce)`.
pub fn recompute(value: &Value, nonce: &str) -> Digest {
    create_commitment(&canonical_json(value), nonce.as_bytes())
}

/// A nonced commitment to one value.
///
/// While the value is disclosed the nonce travels with it. Redaction
/// clears the nonce and leaves the hash as an opaque binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceHash {
    pub hash: Digest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl NonceHash {
    /// Commit to `value` under a fresh random nonce.
    pub fn commit(value: &Value) -> Self {
        let nonce = generate_nonce();
        Self {
            hash: recompute(value, &nonce),
            nonce: Some(nonce),
        }
    }

    /// Whether the nonce is still present.
    pub fn is_disclosed(&self) -> bool {
        self.nonce.is_some()
    }

    /// Check `value` against this commitment.
    ///
    /// Returns `None` once the nonce has been cleared.
    pub fn matches(&self, value: &Value) -> Option<bool> {
        self.nonce
            .as_deref()
            .map(|nonce| recompute(value, nonce) == self.hash)
    }

    /// Drop the nonce, keeping the hash.
    pub fn clear_nonce(&mut self) {
        self.nonce = None;
    }

    /// Positional `[hash, nonce]` form.
    pub fn compress(&self) -> CompressedNonceHash {
        (self.hash, self.nonce.clone())
    }

    /// Inverse of [`NonceHash::compress`].
    pub fn decompress(compressed: CompressedNonceHash) -> Self {
        Self {
            hash: compressed.0,
            nonce: compressed.1,
        }
    }
}

/// Per-property commitments of a claim's contents, in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimHashTree(BTreeMap<String, NonceHash>);

impl ClaimHashTree {
    /// Commit every property of `contents` under its own fresh nonce.
    pub fn commit(contents: &BTreeMap<String, Value>) -> Self {
        let tree: BTreeMap<String, NonceHash> = contents
            .iter()
            .map(|(key, value)| (key.clone(), NonceHash::commit(value)))
            .collect();
        tracing::debug!(properties = tree.len(), "claim contents committed");
        Self(tree)
    }

    /// Commitment for `key`.
    pub fn get(&self, key: &str) -> Option<&NonceHash> {
        self.0.get(key)
    }

    /// Mutable commitment for `key`, used by redaction.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut NonceHash> {
        self.0.get_mut(key)
    }

    /// Whether `key` was committed.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Committed property names in key order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Commitments in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &NonceHash)> {
        self.0.iter()
    }

    /// Number of committed properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no property was committed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Commitment hashes in key order.
    pub fn hashes(&self) -> Vec<Digest> {
        self.0.values().map(|entry| entry.hash).collect()
    }

    /// Re-derive the hash for `key` from a candidate value.
    ///
    /// `Ok(None)` means the entry exists but its nonce was cleared.
    pub fn recompute(&self, key: &str, value: &Value) -> Result<Option<Digest>, CredentialError> {
        let entry = self
            .0
            .get(key)
            .ok_or_else(|| CredentialError::PropertyNotFound(key.to_string()))?;
        Ok(entry.nonce.as_deref().map(|nonce| recompute(value, nonce)))
    }

    /// Key-sorted map of compressed commitments.
    pub fn compress(&self) -> BTreeMap<String, CompressedNonceHash> {
        self.0
            .iter()
            .map(|(key, entry)| (key.clone(), entry.compress()))
            .collect()
    }

    /// Inverse of [`ClaimHashTree::compress`].
    pub fn decompress(compressed: BTreeMap<String, CompressedNonceHash>) -> Self {
        Self(
            compressed
                .into_iter()
                .map(|(key, entry)| (key, NonceHash::decompress(entry)))
                .collect(),
        )
    }
}
