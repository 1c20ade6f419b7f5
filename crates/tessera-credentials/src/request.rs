use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tessera_core::opaque::{AttesterPublicKey, ClaimerPeSession, InitToken, PeRequest};
use tessera_core::{Address, CTypeHash, DelegationId, Digest};
use tessera_crypto::{hash_leaves, verify_digest, PublicKey, Signature};
use tessera_identity::Identity;

use crate::claim::{Claim, CompressedClaim};
use crate::commitment::{ClaimHashTree, CompressedNonceHash, NonceHash};
use crate::credential::{CompressedCredential, Credential};
use crate::error::CredentialError;
use crate::privacy::PrivacyEngine;

/// Compressed request:
/// `[claim, claimHashTree, claimOwnerCommitment, claimerSignature,
///   cTypeCommitment, rootHash, [legitimation...], delegationId]`.
pub type CompressedRequest = (
    CompressedClaim,
    BTreeMap<String, CompressedNonceHash>,
    CompressedNonceHash,
    (Address, Signature),
    CompressedNonceHash,
    Digest,
    Vec<CompressedCredential>,
    Option<DelegationId>,
);

/// The claimer's signature over the root hash, with the signing address
/// captured so it survives owner redaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimerSignature {
    pub signer: Address,
    pub signature: Signature,
}

/// A claimer's request for attestation: a claim plus the commitment
/// structure that lets it be partially disclosed later.
///
/// `root_hash` binds every commitment leaf and never changes after
/// construction, redaction included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    pub claim: Claim,
    pub claim_owner_commitment: NonceHash,
    pub ctype_commitment: NonceHash,
    pub claim_hash_tree: ClaimHashTree,
    #[serde(default)]
    pub legitimations: Vec<Credential>,
    #[serde(default)]
    pub delegation_id: Option<DelegationId>,
    pub root_hash: Digest,
    pub claimer_signature: ClaimerSignature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_enhancement: Option<PeRequest>,
}

fn owner_value(owner: &Address) -> Value {
    Value::String(owner.to_string())
}

fn ctype_value(ctype_hash: &CTypeHash) -> Value {
    Value::String(ctype_hash.to_hex())
}

impl CredentialRequest {
    /// Commit to `claim` and sign the root hash as `identity`.
    pub fn build(
        claim: Claim,
        identity: &Identity,
        legitimations: Vec<Credential>,
        delegation_id: Option<DelegationId>,
    ) -> Result<Self, CredentialError> {
        let owner = match &claim.owner {
            Some(owner) if owner == identity.address() => owner.clone(),
            other => {
                return Err(CredentialError::OwnerMismatch {
                    expected: identity.address().clone(),
                    found: other.clone(),
                })
            }
        };

        let claim_owner_commitment = NonceHash::commit(&owner_value(&owner));
        let ctype_commitment = NonceHash::commit(&ctype_value(&claim.ctype_hash));
        let claim_hash_tree = ClaimHashTree::commit(&claim.contents);

        let leaves = Self::collect_leaves(
            &claim_owner_commitment,
            &ctype_commitment,
            &claim_hash_tree,
            &legitimations,
            delegation_id.as_ref(),
        );
        let root_hash = hash_leaves(&leaves);
        let signature = identity.sign_digest(&root_hash);

        tracing::debug!(
            root_hash = %root_hash,
            ctype_hash = %claim.ctype_hash,
            leaves = leaves.len(),
            "credential request built"
        );

        Ok(Self {
            claim,
            claim_owner_commitment,
            ctype_commitment,
            claim_hash_tree,
            legitimations,
            delegation_id,
            root_hash,
            claimer_signature: ClaimerSignature {
                signer: owner,
                signature,
            },
            privacy_enhancement: None,
        })
    }

    /// Like [`build`](Self::build), and also produce the blinded PE request
    /// for the attester's session. The returned session stays with the
    /// claimer.
    pub async fn build_with_privacy(
        claim: Claim,
        identity: &Identity,
        legitimations: Vec<Credential>,
        delegation_id: Option<DelegationId>,
        engine: &dyn PrivacyEngine,
        init_token: &InitToken,
        attester_key: &AttesterPublicKey,
    ) -> Result<(Self, ClaimerPeSession), CredentialError> {
        let mut request = Self::build(claim, identity, legitimations, delegation_id)?;
        let (session, pe_request) = engine
            .request_attestation(&request.claim, init_token, attester_key)
            .await?;
        request.privacy_enhancement = Some(pe_request);
        Ok((request, session))
    }

    fn collect_leaves(
        owner: &NonceHash,
        ctype: &NonceHash,
        tree: &ClaimHashTree,
        legitimations: &[Credential],
        delegation_id: Option<&DelegationId>,
    ) -> Vec<Digest> {
        let mut leaves = Vec::with_capacity(2 + tree.len() + legitimations.len() + 1);
        leaves.push(owner.hash);
        leaves.push(ctype.hash);
        leaves.extend(tree.hashes());
        leaves.extend(legitimations.iter().map(|l| l.attestation.claim_hash));
        if let Some(id) = delegation_id {
            leaves.push(*id);
        }
        leaves
    }

    /// Commitment leaves in root-hash order.
    pub fn leaves(&self) -> Vec<Digest> {
        Self::collect_leaves(
            &self.claim_owner_commitment,
            &self.ctype_commitment,
            &self.claim_hash_tree,
            &self.legitimations,
            self.delegation_id.as_ref(),
        )
    }

    /// Root hash recomputed from the current commitments.
    pub fn compute_root_hash(&self) -> Digest {
        hash_leaves(&self.leaves())
    }

    /// Remove `properties` from the disclosed contents.
    ///
    /// Every key is checked before anything changes, so an unknown key
    /// leaves the request untouched. Already-redacted keys are accepted.
    pub fn redact<S: AsRef<str>>(&mut self, properties: &[S]) -> Result<(), CredentialError> {
        if let Some(missing) = properties
            .iter()
            .map(|p| p.as_ref())
            .find(|key| !self.claim_hash_tree.contains_key(key))
        {
            return Err(CredentialError::PropertyNotFound(missing.to_string()));
        }

        for key in properties.iter().map(|p| p.as_ref()) {
            self.claim.contents.remove(key);
            if let Some(entry) = self.claim_hash_tree.get_mut(key) {
                entry.clear_nonce();
            }
        }
        Ok(())
    }

    /// Drop the owner from the claim and clear its commitment nonce.
    ///
    /// The signer address in `claimer_signature` is kept so the signature
    /// still verifies, and it is the owner's address. A verifier therefore
    /// still learns who the claimer is; this is not an anonymity feature.
    pub fn redact_owner(&mut self) {
        self.claim.owner = None;
        self.claim_owner_commitment.clear_nonce();
    }

    /// Check that the disclosed data matches its commitments and the
    /// claimer's signature.
    ///
    /// `Ok(false)` covers every tampering case. `Err` means a disclosed
    /// property has no commitment at all.
    pub fn verify_data(&self) -> Result<bool, CredentialError> {
        for (key, value) in &self.claim.contents {
            let entry = self
                .claim_hash_tree
                .get(key)
                .ok_or_else(|| CredentialError::MissingTreeEntry(key.clone()))?;
            match entry.matches(value) {
                Some(true) => {}
                Some(false) => return Ok(self.reject("property hash mismatch", Some(key.as_str()))),
                None => return Ok(self.reject("property disclosed without nonce", Some(key.as_str()))),
            }
        }

        for (key, entry) in self.claim_hash_tree.iter() {
            if entry.is_disclosed() && !self.claim.contents.contains_key(key) {
                return Ok(self.reject("nonce kept for a removed property", Some(key.as_str())));
            }
        }

        match (&self.claim.owner, self.claim_owner_commitment.is_disclosed()) {
            (Some(owner), true) => {
                if self.claim_owner_commitment.matches(&owner_value(owner)) != Some(true) {
                    return Ok(self.reject("owner commitment mismatch", None));
                }
            }
            (None, false) => {}
            _ => return Ok(self.reject("owner and owner nonce disagree", None)),
        }

        if let Some(false) = self
            .ctype_commitment
            .matches(&ctype_value(&self.claim.ctype_hash))
        {
            return Ok(self.reject("CType commitment mismatch", None));
        }

        if self.compute_root_hash() != self.root_hash {
            return Ok(self.reject("root hash mismatch", None));
        }

        for legitimation in &self.legitimations {
            if !legitimation.verify_data()? {
                return Ok(self.reject("legitimation failed verification", None));
            }
        }

        let signer = &self.claimer_signature.signer;
        if let Some(owner) = &self.claim.owner {
            if owner != signer {
                return Ok(self.reject("claim owner is not the signer", None));
            }
        }
        let Ok(public_key) = PublicKey::from_address(signer) else {
            return Ok(self.reject("signer address is not a valid key", None));
        };
        if verify_digest(
            &self.root_hash,
            &self.claimer_signature.signature,
            &public_key,
        )
        .is_err()
        {
            return Ok(self.reject("claimer signature invalid", None));
        }

        Ok(true)
    }

    fn reject(&self, reason: &str, property: Option<&str>) -> bool {
        tracing::warn!(
            root_hash = %self.root_hash,
            property = property.unwrap_or("-"),
            reason,
            "credential request failed verification"
        );
        false
    }

    /// Hash identifying this request, and the key of its attestation.
    pub fn hash(&self) -> &Digest {
        &self.root_hash
    }

    /// CType of the requested claim.
    pub fn ctype_hash(&self) -> &CTypeHash {
        &self.claim.ctype_hash
    }

    /// The address that signed this request.
    pub fn signer(&self) -> &Address {
        &self.claimer_signature.signer
    }

    /// Positional 8-tuple form. The PE part is not included.
    pub fn compress(&self) -> CompressedRequest {
        (
            self.claim.compress(),
            self.claim_hash_tree.compress(),
            self.claim_owner_commitment.compress(),
            (
                self.claimer_signature.signer.clone(),
                self.claimer_signature.signature.clone(),
            ),
            self.ctype_commitment.compress(),
            self.root_hash,
            self.legitimations.iter().map(Credential::compress).collect(),
            self.delegation_id,
        )
    }

    /// Inverse of [`compress`](Self::compress). The compressed form does
    /// not carry the PE request.
    pub fn decompress(compressed: CompressedRequest) -> Self {
        let (claim, tree, owner, (signer, signature), ctype, root_hash, legitimations, delegation_id) =
            compressed;
        Self {
            claim: Claim::decompress(claim),
            claim_owner_commitment: NonceHash::decompress(owner),
            ctype_commitment: NonceHash::decompress(ctype),
            claim_hash_tree: ClaimHashTree::decompress(tree),
            legitimations: legitimations
                .into_iter()
                .map(Credential::decompress)
                .collect(),
            delegation_id,
            root_hash,
            claimer_signature: ClaimerSignature { signer, signature },
            privacy_enhancement: None,
        }
    }
}
