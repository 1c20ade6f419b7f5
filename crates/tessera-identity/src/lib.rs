//! Tessera Identity Layer
//!
//! Key material of protocol participants:
//! - `Identity`: Ed25519 signing key, derived X25519 box key, ledger address
//! - `PublicIdentity`: the shareable half (address + box public key)
//! - `AttesterIdentity`: an identity plus an optional PE attestation capability

pub mod attester;
pub mod error;
pub mod identity;

pub use attester::{AttestationCapability, AttesterIdentity};
pub use error::IdentityError;
pub use identity::{Identity, PublicIdentity};
