//! Seam to the zero-knowledge anonymous-credential engine.
//!
//! The engine is external. Tessera only moves its opaque tokens between
//! parties and decides when each primitive is called. An engine instance
//! belongs to one party and holds that party's PE secrets itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::opaque::{
    Accumulator, AttesterPeSession, AttesterPublicKey, ClaimerPeSession, InitToken, PeAttestation,
    PePresentation, PePresentationRequest, PeRequest, PeVerifierSession, Witness, ZkCredential,
};
use tessera_core::CTypeHash;
use tessera_identity::AttestationCapability;

use crate::claim::Claim;
use crate::error::PrivacyError;

/// What a verifier wants disclosed for one CType.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationRequirement {
    pub ctype_hash: CTypeHash,
    pub properties: Vec<String>,
}

#[async_trait]
pub trait PrivacyEngine: Send + Sync {
    /// Fresh PE key pair for an attester.
    async fn generate_attester_keys(&self) -> Result<AttestationCapability, PrivacyError>;

    /// Attester: open an issuance session.
    async fn start_attestation_session(
        &self,
        attester: &AttestationCapability,
    ) -> Result<(InitToken, AttesterPeSession), PrivacyError>;

    /// Claimer: blind `claim` for the attester's session.
    async fn request_attestation(
        &self,
        claim: &Claim,
        init_token: &InitToken,
        attester_key: &AttesterPublicKey,
    ) -> Result<(ClaimerPeSession, PeRequest), PrivacyError>;

    /// Attester: sign the blinded request and register it in `accumulator`.
    async fn issue_attestation(
        &self,
        attester: &AttestationCapability,
        session: &AttesterPeSession,
        request: &PeRequest,
        accumulator: &Accumulator,
    ) -> Result<(Witness, PeAttestation), PrivacyError>;

    /// Claimer: unblind the attestation into an anonymous credential.
    async fn build_credential(
        &self,
        session: &ClaimerPeSession,
        attestation: &PeAttestation,
    ) -> Result<ZkCredential, PrivacyError>;

    /// Verifier: combined request across CTypes.
    async fn request_presentation(
        &self,
        requirements: &[PresentationRequirement],
    ) -> Result<(PeVerifierSession, PePresentationRequest), PrivacyError>;

    /// Claimer: one proof over all `credentials`, in request order.
    async fn build_combined_presentation(
        &self,
        credentials: &[ZkCredential],
        request: &PePresentationRequest,
        attester_keys: &[AttesterPublicKey],
    ) -> Result<PePresentation, PrivacyError>;

    /// Verifier: check the proof, returning the disclosed claims per CType.
    async fn verify_combined_presentation(
        &self,
        proof: &PePresentation,
        session: &PeVerifierSession,
        accumulators: &[Accumulator],
        attester_keys: &[AttesterPublicKey],
    ) -> Result<(bool, Vec<Value>), PrivacyError>;

    async fn create_accumulator(
        &self,
        attester: &AttestationCapability,
    ) -> Result<Accumulator, PrivacyError>;

    /// Remove `witnesses` from `accumulator`, returning the new version.
    async fn revoke_witness(
        &self,
        attester: &AttestationCapability,
        accumulator: &Accumulator,
        witnesses: &[Witness],
    ) -> Result<Accumulator, PrivacyError>;
}
