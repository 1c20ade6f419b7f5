use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tessera_core::opaque::{ClaimerPeSession, PeAttestation, ZkCredential};
use tessera_core::{Address, CTypeHash, DelegationId, Digest};

use crate::attestation::{AttestationRecord, CompressedAttestation};
use crate::error::CredentialError;
use crate::ledger::Ledger;
use crate::privacy::PrivacyEngine;
use crate::request::{CompressedRequest, CredentialRequest};

/// Compressed credential: `[request, attestation]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedCredential(pub CompressedRequest, pub CompressedAttestation);

/// A claimer-held credential: a request plus the attestation over its root
/// hash, and optionally the zero-knowledge credential built alongside.
///
/// The zero-knowledge part never leaves the claimer, so it is not
/// serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub request: CredentialRequest,
    pub attestation: AttestationRecord,
    #[serde(skip)]
    pub privacy_credential: Option<ZkCredential>,
}

impl Credential {
    /// Pair a request with its attestation.
    pub fn from_request_and_attestation(
        request: CredentialRequest,
        attestation: AttestationRecord,
    ) -> Self {
        if request.root_hash != attestation.claim_hash {
            tracing::warn!(
                root_hash = %request.root_hash,
                claim_hash = %attestation.claim_hash,
                "attestation is for a different request"
            );
        }
        Self {
            request,
            attestation,
            privacy_credential: None,
        }
    }

    /// Build the credential and, from the claimer's PE session and the
    /// attester's zero-knowledge attestation, its anonymous counterpart.
    pub async fn from_request_and_attestation_pe(
        request: CredentialRequest,
        attestation: AttestationRecord,
        engine: &dyn PrivacyEngine,
        session: &ClaimerPeSession,
        pe_attestation: &PeAttestation,
    ) -> Result<Self, CredentialError> {
        let privacy_credential = engine.build_credential(session, pe_attestation).await?;
        let mut credential = Self::from_request_and_attestation(request, attestation);
        credential.privacy_credential = Some(privacy_credential);
        Ok(credential)
    }

    /// Copy of the request disclosing only `revealed` (and the owner if
    /// `reveal_owner`). Unknown property names are an error.
    ///
    /// Hiding the owner leaves the claimer's signing address in the
    /// signature, see [`CredentialRequest::redact_owner`].
    pub fn create_presentation<S: AsRef<str>>(
        &self,
        revealed: &[S],
        reveal_owner: bool,
    ) -> Result<CredentialRequest, CredentialError> {
        if let Some(unknown) = revealed
            .iter()
            .map(|p| p.as_ref())
            .find(|key| !self.request.claim_hash_tree.contains_key(key))
        {
            return Err(CredentialError::PropertyNotFound(unknown.to_string()));
        }

        let hidden: Vec<String> = self
            .request
            .claim_hash_tree
            .keys()
            .filter(|key| !revealed.iter().any(|r| r.as_ref() == key.as_str()))
            .cloned()
            .collect();

        let mut presentation = self.request.clone();
        presentation.redact(&hidden)?;
        if !reveal_owner {
            presentation.redact_owner();
        }
        tracing::debug!(
            claim_hash = %self.attestation.claim_hash,
            revealed = revealed.len(),
            hidden = hidden.len(),
            reveal_owner,
            "presentation created"
        );
        Ok(presentation)
    }

    /// The presentation paired with this credential's attestation, ready to
    /// send to a verifier.
    pub fn create_presentation_credential<S: AsRef<str>>(
        &self,
        revealed: &[S],
        reveal_owner: bool,
    ) -> Result<Credential, CredentialError> {
        let request = self.create_presentation(revealed, reveal_owner)?;
        Ok(Self::from_request_and_attestation(
            request,
            self.attestation.clone(),
        ))
    }

    /// Offline check: request integrity and that the attestation is for it.
    pub fn verify_data(&self) -> Result<bool, CredentialError> {
        if self.request.root_hash != self.attestation.claim_hash {
            return Ok(false);
        }
        self.request.verify_data()
    }

    /// Full check against the ledger.
    pub async fn verify(&self, ledger: &dyn Ledger) -> Result<bool, CredentialError> {
        if !self.verify_data()? {
            return Ok(false);
        }
        self.attestation.verify(ledger).await
    }

    /// Disclosed properties.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.request.claim.contents
    }

    /// CType of the attested claim.
    pub fn ctype_hash(&self) -> &CTypeHash {
        &self.attestation.ctype_hash
    }

    /// Claim owner, `None` once redacted.
    pub fn owner(&self) -> Option<&Address> {
        self.request.claim.owner.as_ref()
    }

    /// Address of the attester.
    pub fn attester(&self) -> &Address {
        &self.attestation.owner
    }

    /// Delegation node the attestation was made under.
    pub fn delegation_id(&self) -> Option<&DelegationId> {
        self.attestation.delegation_id.as_ref()
    }

    /// Root hash, also the attestation's claim hash.
    pub fn hash(&self) -> &Digest {
        &self.attestation.claim_hash
    }

    /// Whether a zero-knowledge credential is attached.
    pub fn is_privacy_enhanced(&self) -> bool {
        self.privacy_credential.is_some()
    }

    /// Positional `[request, attestation]` form.
    pub fn compress(&self) -> CompressedCredential {
        CompressedCredential(self.request.compress(), self.attestation.compress())
    }

    /// Inverse of [`Credential::compress`].
    pub fn decompress(compressed: CompressedCredential) -> Self {
        let CompressedCredential(request, attestation) = compressed;
        Self {
            request: CredentialRequest::decompress(request),
            attestation: AttestationRecord::decompress(attestation),
            privacy_credential: None,
        }
    }
}
