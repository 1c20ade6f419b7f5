/// Failures of the key, signature and box primitives.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("{what} must be {expected} bytes, got {actual}")]
    WrongLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("not an ed25519 public key: {0}")]
    InvalidPublicKey(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signature does not match")]
    BadSignature,

    #[error("box could not be sealed")]
    Seal,

    #[error("box could not be opened")]
    Open,
}
