use tessera_core::Address;

/// Identity-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    #[error("invalid box public key: {0}")]
    InvalidBoxKey(String),

    #[error("identity {0} has no attestation capability")]
    NoAttestationCapability(Address),

    #[error("crypto error: {0}")]
    Crypto(#[from] tessera_crypto::CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
