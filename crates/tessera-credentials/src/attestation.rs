use serde::{Deserialize, Serialize};
use tessera_core::{Address, CTypeHash, DelegationId, Digest};
use tessera_identity::{Identity, PublicIdentity};

use crate::error::CredentialError;
use crate::ledger::{Ledger, Receipt};
use crate::request::CredentialRequest;

/// Compressed attestation: `[claimHash, cTypeHash, owner, revoked, delegationId]`.
pub type CompressedAttestation = (Digest, CTypeHash, Address, bool, Option<DelegationId>);

/// An attester's on-ledger statement vouching for one request's root hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRecord {
    pub claim_hash: Digest,
    pub ctype_hash: CTypeHash,
    /// The attester.
    pub owner: Address,
    #[serde(default)]
    pub delegation_id: Option<DelegationId>,
    #[serde(default)]
    pub revoked: bool,
}

impl AttestationRecord {
    /// Attest `request` as `attester`. An explicit `delegation_id` takes
    /// precedence over the one the claimer put in the request.
    pub fn from_request(
        request: &CredentialRequest,
        attester: &PublicIdentity,
        delegation_id: Option<DelegationId>,
    ) -> Self {
        Self {
            claim_hash: request.root_hash,
            ctype_hash: request.claim.ctype_hash,
            owner: attester.address.clone(),
            delegation_id: delegation_id.or(request.delegation_id),
            revoked: false,
        }
    }

    /// Write the record to the ledger, signed by the attester.
    pub async fn store(
        &self,
        ledger: &dyn Ledger,
        attester: &Identity,
    ) -> Result<Receipt, CredentialError> {
        let receipt = ledger.store_attestation(self, attester).await?;
        tracing::info!(
            claim_hash = %self.claim_hash,
            attester = %self.owner,
            delegation_id = ?self.delegation_id,
            "attestation stored"
        );
        Ok(receipt)
    }

    /// Revoke on the ledger. Allowed for the attester and for the owner of
    /// any delegation above the attestation's node.
    pub async fn revoke(
        &self,
        ledger: &dyn Ledger,
        identity: &Identity,
    ) -> Result<Receipt, CredentialError> {
        let receipt = ledger.revoke_attestation(&self.claim_hash, identity).await?;
        tracing::info!(claim_hash = %self.claim_hash, by = %identity.address(), "attestation revoked");
        Ok(receipt)
    }

    /// Fetch the record stored under `claim_hash`.
    pub async fn query(
        ledger: &dyn Ledger,
        claim_hash: &Digest,
    ) -> Result<Option<Self>, CredentialError> {
        Ok(ledger.query_attestation(claim_hash).await?)
    }

    /// Whether the ledger holds this exact attestation, unrevoked.
    pub async fn verify(&self, ledger: &dyn Ledger) -> Result<bool, CredentialError> {
        let Some(stored) = Self::query(ledger, &self.claim_hash).await? else {
            tracing::warn!(claim_hash = %self.claim_hash, "attestation not on ledger");
            return Ok(false);
        };
        let valid = !stored.revoked
            && stored.owner == self.owner
            && stored.ctype_hash == self.ctype_hash
            && stored.delegation_id == self.delegation_id;
        if !valid {
            tracing::warn!(
                claim_hash = %self.claim_hash,
                revoked = stored.revoked,
                "attestation does not match ledger record"
            );
        }
        Ok(valid)
    }

    /// Whether any unrevoked attestation exists for `claim_hash`.
    pub async fn check_validity(
        ledger: &dyn Ledger,
        claim_hash: &Digest,
    ) -> Result<bool, CredentialError> {
        Ok(Self::query(ledger, claim_hash)
            .await?
            .is_some_and(|record| !record.revoked))
    }

    /// Positional `[claimHash, cTypeHash, owner, revoked, delegationId]` form.
    pub fn compress(&self) -> CompressedAttestation {
        (
            self.claim_hash,
            self.ctype_hash,
            self.owner.clone(),
            self.revoked,
            self.delegation_id,
        )
    }

    /// Inverse of [`AttestationRecord::compress`].
    pub fn decompress(compressed: CompressedAttestation) -> Self {
        let (claim_hash, ctype_hash, owner, revoked, delegation_id) = compressed;
        Self {
            claim_hash,
            ctype_hash,
            owner,
            delegation_id,
            revoked,
        }
    }
}
