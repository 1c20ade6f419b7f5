use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use crate::error::CoreError;

/// A 32-byte digest, rendered as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; 32]);

/// Hash identifying a CType (claim schema).
pub type CTypeHash = Digest;

/// Identifier of a delegation root or delegation node.
pub type DelegationId = Digest;

impl Digest {
    /// Digest length in bytes.
    pub const LEN: usize = 32;

    /// Create from a 32-byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            CoreError::InvalidDigest(format!("expected {} bytes, got {}", Self::LEN, bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode as `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Decode from hex, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| CoreError::InvalidDigest(format!("invalid hex '{}': {}", s, e)))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A ledger account address: the base58 encoding of an Ed25519 public key.
///
/// The encoded form is validated on construction, so every `Address`
/// carries a well-formed 32-byte key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    encoded: String,
    key: [u8; 32],
}

impl Address {
    /// Parse a base58 address.
    pub fn new(encoded: impl Into<String>) -> Result<Self, CoreError> {
        let encoded = encoded.into();
        let bytes = bs58::decode(&encoded)
            .into_vec()
            .map_err(|e| CoreError::InvalidAddress(format!("'{}': {}", encoded, e)))?;
        let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CoreError::InvalidAddress(format!(
                "'{}' decodes to {} bytes, expected 32",
                encoded,
                bytes.len()
            ))
        })?;
        Ok(Self { encoded, key })
    }

    /// Build the address of a raw Ed25519 public key.
    pub fn from_public_key(key: &[u8; 32]) -> Self {
        Self {
            encoded: bs58::encode(key).into_string(),
            key: *key,
        }
    }

    /// The base58 string.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// The Ed25519 public key bytes behind this address.
    pub fn public_key_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encoded)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encoded)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.encoded
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Delegation permission bitset: bit0 = ATTEST, bit1 = DELEGATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Permissions(u32);

impl Permissions {
    /// May create attestations carrying the node id.
    pub const ATTEST: Permissions = Permissions(1);
    /// May create child delegation nodes.
    pub const DELEGATE: Permissions = Permissions(2);

    const ALL_BITS: u32 = 0b11;

    /// No permissions.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Both ATTEST and DELEGATE.
    pub const fn all() -> Self {
        Self(Self::ALL_BITS)
    }

    /// Raw bits.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Create from raw bits, rejecting unknown flags.
    pub fn from_bits(bits: u32) -> Result<Self, CoreError> {
        if bits & !Self::ALL_BITS != 0 {
            return Err(CoreError::InvalidPermissions(format!(
                "unknown permission bits in {:#x}",
                bits
            )));
        }
        Ok(Self(bits))
    }

    /// Whether every flag in `other` is set.
    pub fn contains(&self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    /// Little-endian 4-byte wire form.
    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Parse the little-endian 4-byte wire form.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; 4] = bytes.try_into().map_err(|_| {
            CoreError::InvalidPermissions(format!("expected 4 bytes, got {}", bytes.len()))
        })?;
        Self::from_bits(u32::from_le_bytes(arr))
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Self) -> Self::Output {
        Permissions(self.0 | rhs.0)
    }
}

impl TryFrom<u32> for Permissions {
    type Error = CoreError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_bits(value)
    }
}

impl From<Permissions> for u32 {
    fn from(p: Permissions) -> Self {
        p.0
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::ATTEST) {
            names.push("ATTEST");
        }
        if self.contains(Self::DELEGATE) {
            names.push("DELEGATE");
        }
        if names.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// Current time as milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
