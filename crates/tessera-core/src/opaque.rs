//! Opaque tokens exchanged with the privacy-enhancement (PE) engine.
//!
//! The zero-knowledge credential primitives live outside Tessera. Their
//! keys, sessions, proofs and accumulators pass through the protocol as
//! JSON values whose structure only the engine understands. Each kind gets
//! its own newtype so the protocol cannot hand a session where a witness is
//! expected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

macro_rules! opaque_token {
    ($($(#[$meta:meta])* $name:ident;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub Value);

            impl $name {
                /// Wrap an engine-produced value.
                pub fn new(value: Value) -> Self {
                    Self(value)
                }

                /// The wrapped engine value.
                pub fn as_value(&self) -> &Value {
                    &self.0
                }
            }
        )+
    };
}

opaque_token! {
    /// Attester-to-claimer token opening a PE attestation session.
    InitToken;
    /// Attester-side state of a PE attestation session.
    AttesterPeSession;
    /// Claimer-side state of a PE attestation session. Never serialized onto the wire.
    ClaimerPeSession;
    /// Blinded attestation request produced by the claimer.
    PeRequest;
    /// Zero-knowledge attestation issued by the attester.
    PeAttestation;
    /// Per-credential token needed to revoke it from an accumulator.
    Witness;
    /// Claimer-held anonymous credential.
    ZkCredential;
    /// Revocation accumulator published by an attester.
    Accumulator;
    /// Public PE key of an attester.
    AttesterPublicKey;
    /// Private PE key of an attester.
    AttesterPrivateKey;
    /// Verifier-side state of a PE presentation session.
    PeVerifierSession;
    /// Verifier's PE presentation request.
    PePresentationRequest;
    /// Combined zero-knowledge presentation proof.
    PePresentation;
}
