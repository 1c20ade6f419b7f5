use tessera_core::Address;

/// Envelope and message-level errors.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("{role} address mismatch: envelope has {got}, expected {expected}")]
    AddressMismatch {
        role: &'static str,
        expected: Address,
        got: Address,
    },

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("message hash mismatch")]
    HashMismatch,

    #[error("message signature invalid")]
    SignatureInvalid,

    #[error("message body could not be parsed: {0}")]
    BodyParseError(String),

    #[error("{owner} in the message body is not the sender {sender}")]
    OwnerNotSender { owner: Address, sender: Address },

    #[error("identity error: {0}")]
    Identity(#[from] tessera_identity::IdentityError),

    #[error("serialization error: {0}")]
    Serialization(String),
}
