//! Ed25519 signatures over raw bytes and over digests. On the wire a
//! signature is 128 hex characters.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tessera_core::Digest;

use crate::error::CryptoError;
use crate::keys::{KeyPair, PublicKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    /// Encoded length in bytes.
    pub const LEN: usize = ed25519_dalek::SIGNATURE_LENGTH;

    /// Parse 64 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let raw: [u8; Self::LEN] = bytes.try_into().map_err(|_| CryptoError::WrongLength {
            what: "signature",
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(ed25519_dalek::Signature::from_bytes(&raw)))
    }

    /// Raw 64-byte form.
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        self.0.to_bytes()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl FromStr for Signature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

/// Sign raw bytes.
pub fn sign(message: &[u8], keypair: &KeyPair) -> Signature {
    Signature(keypair.signing_key().sign(message))
}

/// Check a signature over raw bytes.
pub fn verify(message: &[u8], signature: &Signature, signer: &PublicKey) -> Result<(), CryptoError> {
    signer
        .verifying_key()
        .verify(message, &signature.0)
        .map_err(|_| CryptoError::BadSignature)
}

/// Sign the 32 bytes of a digest. Root hashes, delegation hashes and
/// envelope hashes are all signed this way.
pub fn sign_digest(digest: &Digest, keypair: &KeyPair) -> Signature {
    sign(digest.as_bytes(), keypair)
}

/// Check a signature over a digest.
pub fn verify_digest(
    digest: &Digest,
    signature: &Signature,
    signer: &PublicKey,
) -> Result<(), CryptoError> {
    verify(digest.as_bytes(), signature, signer)
}
