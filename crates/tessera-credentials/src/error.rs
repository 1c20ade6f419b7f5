use tessera_core::{Address, CTypeHash, Digest};

/// Errors raised while building, redacting or checking credential objects.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("claim owner {found:?} does not match identity {expected}")]
    OwnerMismatch {
        expected: Address,
        found: Option<Address>,
    },

    #[error("property not found: {0}")]
    PropertyNotFound(String),

    #[error("claim content '{0}' has no entry in the claim hash tree")]
    MissingTreeEntry(String),

    #[error("invalid claim: {0}")]
    InvalidClaim(String),

    #[error("invalid CType: {0}")]
    InvalidCType(String),

    #[error("schema validation error: {0}")]
    SchemaValidation(String),

    #[error("claim contents do not match CType {0}")]
    SchemaMismatch(CTypeHash),

    #[error("delegation signature does not verify against {0}")]
    InvalidDelegationSignature(Address),

    #[error("delegation {0} not found")]
    DelegationNotFound(Digest),

    #[error("privacy credential missing")]
    PrivacyCredentialMissing,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("privacy engine error: {0}")]
    Privacy(#[from] PrivacyError),

    #[error("identity error: {0}")]
    Identity(#[from] tessera_identity::IdentityError),

    #[error("core error: {0}")]
    Core(#[from] tessera_core::CoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors reported by a [`crate::Ledger`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("claim {0} is already attested")]
    AlreadyAttested(Digest),

    #[error("CType {0} is not registered")]
    CTypeNotFound(CTypeHash),

    #[error("already revoked: {0}")]
    AlreadyRevoked(String),

    #[error("{0} is not permitted to revoke")]
    NotPermittedToRevoke(Address),

    #[error("{account} is not permitted to attest: {reason}")]
    NotPermittedToAttest { account: Address, reason: String },

    #[error("delegation signature invalid for node {0}")]
    InvalidDelegationSignature(Digest),

    #[error("delegation {0} is revoked")]
    DelegationRevoked(Digest),

    #[error("stale accumulator: expected index {expected}, ledger is at {actual}")]
    StaleAccumulator { expected: u64, actual: u64 },

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by a [`crate::PrivacyEngine`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrivacyError {
    #[error("missing key: {0}")]
    MissingKey(String),

    #[error("missing session: {0}")]
    MissingSession(String),

    #[error("missing witness: {0}")]
    MissingWitness(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("engine failure: {0}")]
    Engine(String),
}
