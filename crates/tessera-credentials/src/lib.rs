//! Tessera Credentials
//!
//! The data objects of the claimer/attester/verifier model and the
//! collaborator seams they talk to:
//! - Nonced per-property commitments (`NonceHash`, `ClaimHashTree`)
//! - `Claim`, `CType` and schema validation
//! - `CredentialRequest` with redaction and root-hash verification
//! - `AttestationRecord` and `Credential` presentations
//! - Delegation trees with ATTEST / DELEGATE permissions
//! - The `Ledger` trait, an in-memory ledger, and the `PrivacyEngine` trait

pub mod attestation;
pub mod claim;
pub mod commitment;
pub mod credential;
pub mod ctype;
pub mod delegation;
pub mod error;
pub mod ledger;
pub mod memory_ledger;
pub mod privacy;
pub mod request;

pub use attestation::AttestationRecord;
pub use claim::Claim;
pub use commitment::{ClaimHashTree, NonceHash};
pub use credential::Credential;
pub use ctype::{CType, JsonSchemaValidator, SchemaValidator};
pub use delegation::{DelegationNode, DelegationRootNode};
pub use error::{CredentialError, LedgerError, PrivacyError};
pub use ledger::{IndexedAccumulator, Ledger, Receipt};
pub use memory_ledger::InMemoryLedger;
pub use privacy::{PresentationRequirement, PrivacyEngine};
pub use request::{ClaimerSignature, CredentialRequest};
