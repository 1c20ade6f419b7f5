use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use tessera_core::{Address, Digest, IdentityConfig};
use tessera_crypto::{box_public_key, sign, sign_digest, KeyPair, PublicKey, Signature};
use zeroize::Zeroize;

use crate::error::IdentityError;

/// A protocol participant: one Ed25519 key pair, the ledger address it maps
/// to, and the X25519 box key derived from the same seed.
pub struct Identity {
    keypair: KeyPair,
    address: Address,
    box_public_key: [u8; 32],
}

impl Identity {
    /// Create a fresh random identity.
    pub fn generate() -> Self {
        Self::from_keypair(KeyPair::generate())
    }

    /// Recreate an identity from its 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_keypair(KeyPair::from_seed(seed))
    }

    /// Wrap an existing key pair.
    pub fn from_keypair(keypair: KeyPair) -> Self {
        let address = keypair.address();
        let box_public_key = box_public_key(&keypair);
        Self {
            keypair,
            address,
            box_public_key,
        }
    }

    /// Load the identity whose hex seed lives at `config.seed_path`,
    /// creating the file with a fresh seed if it does not exist.
    ///
    /// Without a configured path a throwaway identity is generated.
    pub fn load_or_generate(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let Some(path) = &config.seed_path else {
            return Ok(Self::generate());
        };

        if path.exists() {
            let mut contents = fs::read_to_string(path)?;
            let decoded = hex::decode(contents.trim());
            contents.zeroize();
            let mut bytes =
                decoded.map_err(|e| IdentityError::InvalidSeed(format!("not hex: {}", e)))?;
            let keypair = KeyPair::from_seed_slice(&bytes);
            bytes.zeroize();
            let identity = Self::from_keypair(keypair?);
            tracing::info!(address = %identity.address, path = %path.display(), "identity loaded");
            return Ok(identity);
        }

        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut encoded = hex::encode(seed);
        let written = fs::write(path, &encoded);
        encoded.zeroize();
        let identity = Self::from_seed(&seed);
        seed.zeroize();
        written?;
        tracing::info!(address = %identity.address, path = %path.display(), "identity created");
        Ok(identity)
    }

    /// Ledger address of this identity.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Ed25519 verifying key.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// X25519 key peers encrypt envelopes to.
    pub fn box_public_key(&self) -> &[u8; 32] {
        &self.box_public_key
    }

    /// Underlying key pair, for encryption.
    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// The half of this identity other parties need to address it.
    pub fn public_identity(&self) -> PublicIdentity {
        PublicIdentity {
            address: self.address.clone(),
            box_public_key: hex::encode(self.box_public_key),
        }
    }

    /// Sign raw bytes with the account key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        sign(message, &self.keypair)
    }

    /// Sign a digest with the account key.
    pub fn sign_digest(&self, digest: &Digest) -> Signature {
        sign_digest(digest, &self.keypair)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Public half of an [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub address: Address,
    /// Hex-encoded X25519 box public key.
    pub box_public_key: String,
}

impl PublicIdentity {
    /// Decode the box public key.
    pub fn box_key_bytes(&self) -> Result<[u8; 32], IdentityError> {
        let bytes = hex::decode(&self.box_public_key)
            .map_err(|e| IdentityError::InvalidBoxKey(format!("not hex: {}", e)))?;
        bytes.as_slice().try_into().map_err(|_| {
            IdentityError::InvalidBoxKey(format!("expected 32 bytes, got {}", bytes.len()))
        })
    }

    /// Signature verification key behind the address.
    pub fn public_key(&self) -> Result<PublicKey, IdentityError> {
        Ok(PublicKey::from_address(&self.address)?)
    }
}
