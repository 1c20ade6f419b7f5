//! Account keys. An account is an Ed25519 key pair and its ledger address is
//! the base58 form of the verifying key.

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use tessera_core::Address;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Ed25519 account key pair with its cached address.
pub struct KeyPair {
    signing_key: SigningKey,
    address: Address,
}

impl KeyPair {
    /// Fresh key pair from OS entropy.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Deterministic key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    /// Seed as read back from storage. Only 32 bytes are accepted.
    pub fn from_seed_slice(seed: &[u8]) -> Result<Self, CryptoError> {
        if seed.len() != 32 {
            return Err(CryptoError::WrongLength {
                what: "seed",
                expected: 32,
                actual: seed.len(),
            });
        }
        let mut buf = Zeroizing::new([0u8; 32]);
        buf.copy_from_slice(seed);
        Ok(Self::from_seed(&buf))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = Address::from_public_key(signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Verifying half.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Ledger address of the verifying key.
    pub fn address(&self) -> Address {
        self.address.clone()
    }

    /// Run `f` over a copy of the seed that is wiped when `f` returns.
    pub fn with_seed<R>(&self, f: impl FnOnce(&[u8; 32]) -> R) -> R {
        let seed = Zeroizing::new(self.signing_key.to_bytes());
        f(&seed)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Verifying half of an account key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    /// Recover the key an address was derived from.
    pub fn from_address(address: &Address) -> Result<Self, CryptoError> {
        let verifying_key = VerifyingKey::from_bytes(address.public_key_bytes())
            .map_err(|e| CryptoError::InvalidPublicKey(format!("{}: {}", address, e)))?;
        Ok(Self { verifying_key })
    }

    /// Raw 32-byte key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.verifying_key.as_bytes()
    }

    /// Ledger address of this key.
    pub fn to_address(&self) -> Address {
        Address::from_public_key(self.as_bytes())
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

impl TryFrom<&Address> for PublicKey {
    type Error = CryptoError;

    fn try_from(address: &Address) -> Result<Self, Self::Error> {
        Self::from_address(address)
    }
}
