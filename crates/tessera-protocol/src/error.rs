use tessera_core::{Address, CTypeHash, CoreError, Digest};
use tessera_credentials::{CredentialError, LedgerError, PrivacyError};
use tessera_identity::IdentityError;
use tessera_messaging::{EnvelopeError, MessageBodyType};

/// Errors raised by protocol steps.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unexpected message type {got}, expected {expected}")]
    MessageTypeMismatch {
        got: MessageBodyType,
        expected: MessageBodyType,
    },

    #[error("message from {got}, expected {expected}")]
    UnexpectedSender { expected: Address, got: Address },

    #[error("privacy-enhanced mismatch: {0}")]
    PeMismatch(String),

    #[error("no privacy-enhanced credential for CType {0}")]
    PeCredentialMissing(CTypeHash),

    #[error("no credential for CType {0}")]
    CredentialMissing(CTypeHash),

    #[error("privacy-enhanced attestation requested but no attestation session exists")]
    AttestationSessionMissing,

    #[error("privacy-enhanced presentation received but no verifier session exists")]
    PresentationSessionMissing,

    #[error("request carries no privacy-enhanced part")]
    PeRequestMissing,

    #[error("a privacy engine is required for this step")]
    PrivacyEngineMissing,

    #[error("no accumulator published by {0}")]
    AccumulatorMissing(Address),

    #[error("zero-knowledge verification needs accumulators and attester keys")]
    PeVerificationInputsMissing,

    #[error("credential request {0} failed verification")]
    RequestVerificationFailed(Digest),

    #[error("attestation is for {got}, expected {expected}")]
    AttestationMismatch { expected: Digest, got: Digest },

    #[error("claimer refused to present CTypes {0:?}")]
    PresentationRejected(Vec<CTypeHash>),

    #[error("delegation is for {got}, expected {expected}")]
    DelegateMismatch { expected: Address, got: Address },

    #[error("delegation signature does not verify against {0}")]
    InvalidDelegationSignature(Address),

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(#[from] CoreError),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("privacy engine error: {0}")]
    Privacy(#[from] PrivacyError),

    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
}

impl ProtocolError {
    pub(crate) fn mismatch(got: MessageBodyType, expected: MessageBodyType) -> Self {
        tracing::warn!(%got, %expected, "unexpected message type");
        Self::MessageTypeMismatch { got, expected }
    }
}
