use crate::protocol_state::{
    AttestationEvent, AttestationState, PresentationEvent, PresentationState,
};

/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid attestation transition from {from} on {event:?}")]
    InvalidAttestationTransition {
        from: AttestationState,
        event: AttestationEvent,
    },

    #[error("invalid presentation transition from {from} on {event:?}")]
    InvalidPresentationTransition {
        from: PresentationState,
        event: PresentationEvent,
    },

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid permissions: {0}")]
    InvalidPermissions(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
