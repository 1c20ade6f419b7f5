//! Tessera Protocol
//!
//! The three roles of the exchange and the steps each one runs:
//! - `attester`: initiate, submit or reject, revoke, publish accumulators
//! - `claimer`: request attestation, build the credential, present or refuse
//! - `verifier`: request claims and verify what comes back
//! - `delegation`: propose, accept and record delegation nodes
//!
//! Every step takes the incoming [`Message`](tessera_messaging::Message) and
//! returns the outgoing one. Sealing for the wire is left to the caller.

pub mod attester;
pub mod claimer;
pub mod delegation;
pub mod error;
pub mod session;
pub mod verifier;

pub use error::ProtocolError;
pub use session::{
    AttesterAttestationSession, ClaimerAttestationSession, RevocationHandle, VerifierSession,
};
pub use verifier::{PresentationOutcome, PresentationRequestBuilder};
