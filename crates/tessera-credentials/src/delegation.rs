use serde::{Deserialize, Serialize};
use tessera_core::{Address, CTypeHash, DelegationId, Digest, Permissions};
use tessera_crypto::{hash, random_digest, verify_digest, PublicKey, Signature};
use tessera_identity::Identity;

use crate::error::CredentialError;
use crate::ledger::{Ledger, Receipt};

/// Top of a delegation tree. Fixes the CType every attestation under the
/// tree must use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationRootNode {
    pub id: DelegationId,
    pub ctype_hash: CTypeHash,
    pub account: Address,
    #[serde(default)]
    pub revoked: bool,
}

impl DelegationRootNode {
    /// New root with a random id.
    pub fn new(ctype_hash: CTypeHash, account: Address) -> Self {
        Self::with_id(random_digest(), ctype_hash, account)
    }

    /// Root with a caller-chosen id.
    pub fn with_id(id: DelegationId, ctype_hash: CTypeHash, account: Address) -> Self {
        Self {
            id,
            ctype_hash,
            account,
            revoked: false,
        }
    }

    /// Write the root to the ledger, signed by its account.
    pub async fn store(
        &self,
        ledger: &dyn Ledger,
        identity: &Identity,
    ) -> Result<Receipt, CredentialError> {
        let receipt = ledger.store_delegation_root(self, identity).await?;
        tracing::info!(root_id = %self.id, account = %self.account, "delegation root stored");
        Ok(receipt)
    }

    /// Revoke the root and, on the ledger, every node below it.
    pub async fn revoke(
        &self,
        ledger: &dyn Ledger,
        identity: &Identity,
    ) -> Result<Receipt, CredentialError> {
        let receipt = ledger.revoke_delegation_root(&self.id, identity).await?;
        tracing::info!(root_id = %self.id, "delegation root revoked");
        Ok(receipt)
    }

    /// Fetch a root by id.
    pub async fn query(
        ledger: &dyn Ledger,
        id: &DelegationId,
    ) -> Result<Option<Self>, CredentialError> {
        Ok(ledger.query_delegation_root(id).await?)
    }

    /// Whether the ledger holds this root, unrevoked.
    pub async fn verify(&self, ledger: &dyn Ledger) -> Result<bool, CredentialError> {
        Ok(Self::query(ledger, &self.id).await?.is_some_and(|stored| {
            !stored.revoked && stored.account == self.account && stored.ctype_hash == self.ctype_hash
        }))
    }

    /// Direct children of this root.
    pub async fn get_children(
        &self,
        ledger: &dyn Ledger,
    ) -> Result<Vec<DelegationNode>, CredentialError> {
        Ok(ledger.query_delegation_children(&self.id).await?)
    }
}

/// One delegation below a root.
///
/// A node is only valid with its parent authority's signature over
/// [`generate_hash`](Self::generate_hash). The parent authority is the
/// parent node's account, or the root's account for first-level nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationNode {
    pub id: DelegationId,
    pub root_id: DelegationId,
    #[serde(default)]
    pub parent_id: Option<DelegationId>,
    pub account: Address,
    pub permissions: Permissions,
    #[serde(default)]
    pub revoked: bool,
}

impl DelegationNode {
    /// New node with a random id.
    pub fn new(
        root_id: DelegationId,
        parent_id: Option<DelegationId>,
        account: Address,
        permissions: Permissions,
    ) -> Self {
        Self::with_id(random_digest(), root_id, parent_id, account, permissions)
    }

    /// Node with a caller-chosen id.
    pub fn with_id(
        id: DelegationId,
        root_id: DelegationId,
        parent_id: Option<DelegationId>,
        account: Address,
        permissions: Permissions,
    ) -> Self {
        Self {
            id,
            root_id,
            parent_id,
            account,
            permissions,
            revoked: false,
        }
    }

    /// `H(id || root_id || parent_id? || permissions as u32 LE)`.
    pub fn generate_hash(&self) -> Digest {
        let mut input = Vec::with_capacity(Digest::LEN * 3 + 4);
        input.extend_from_slice(self.id.as_bytes());
        input.extend_from_slice(self.root_id.as_bytes());
        if let Some(parent) = &self.parent_id {
            input.extend_from_slice(parent.as_bytes());
        }
        input.extend_from_slice(&self.permissions.to_le_bytes());
        hash(&input)
    }

    /// Sign this node as its parent authority.
    pub fn authorize(&self, parent: &Identity) -> Signature {
        self.sign(parent)
    }

    /// Sign this node's hash, e.g. as the delegate accepting it.
    pub fn sign(&self, identity: &Identity) -> Signature {
        identity.sign_digest(&self.generate_hash())
    }

    /// Whether `signature` over this node verifies against `signer`.
    pub fn verify_signature(&self, signature: &Signature, signer: &Address) -> bool {
        PublicKey::from_address(signer)
            .and_then(|key| verify_digest(&self.generate_hash(), signature, &key))
            .is_ok()
    }

    /// Account that must authorize this node.
    pub async fn parent_authority(&self, ledger: &dyn Ledger) -> Result<Address, CredentialError> {
        match &self.parent_id {
            Some(parent_id) => Ok(ledger
                .query_delegation_node(parent_id)
                .await?
                .ok_or(CredentialError::DelegationNotFound(*parent_id))?
                .account),
            None => Ok(ledger
                .query_delegation_root(&self.root_id)
                .await?
                .ok_or(CredentialError::DelegationNotFound(self.root_id))?
                .account),
        }
    }

    /// Store on the ledger. The parent signature is checked before the
    /// write is submitted.
    pub async fn store(
        &self,
        ledger: &dyn Ledger,
        identity: &Identity,
        parent_signature: &Signature,
    ) -> Result<Receipt, CredentialError> {
        let authority = self.parent_authority(ledger).await?;
        if !self.verify_signature(parent_signature, &authority) {
            return Err(CredentialError::InvalidDelegationSignature(authority));
        }
        let receipt = ledger
            .store_delegation_node(self, parent_signature, identity)
            .await?;
        tracing::info!(
            node_id = %self.id,
            root_id = %self.root_id,
            account = %self.account,
            permissions = %self.permissions,
            "delegation node stored"
        );
        Ok(receipt)
    }

    /// Fetch a node by id.
    pub async fn query(
        ledger: &dyn Ledger,
        id: &DelegationId,
    ) -> Result<Option<Self>, CredentialError> {
        Ok(ledger.query_delegation_node(id).await?)
    }

    /// Root this node's authority traces to.
    pub async fn get_root(
        &self,
        ledger: &dyn Ledger,
    ) -> Result<DelegationRootNode, CredentialError> {
        ledger
            .query_delegation_root(&self.root_id)
            .await?
            .ok_or(CredentialError::DelegationNotFound(self.root_id))
    }

    /// Parent node, or `None` directly below the root.
    pub async fn get_parent(
        &self,
        ledger: &dyn Ledger,
    ) -> Result<Option<DelegationNode>, CredentialError> {
        let Some(parent_id) = &self.parent_id else {
            return Ok(None);
        };
        ledger
            .query_delegation_node(parent_id)
            .await?
            .map(Some)
            .ok_or(CredentialError::DelegationNotFound(*parent_id))
    }

    /// Direct children of this node.
    pub async fn get_children(
        &self,
        ledger: &dyn Ledger,
    ) -> Result<Vec<DelegationNode>, CredentialError> {
        Ok(ledger.query_delegation_children(&self.id).await?)
    }

    /// Revoke this node and its descendants. Attestations made under it
    /// stay as they are.
    pub async fn revoke(
        &self,
        ledger: &dyn Ledger,
        identity: &Identity,
    ) -> Result<Receipt, CredentialError> {
        let receipt = ledger.revoke_delegation_node(&self.id, identity).await?;
        tracing::info!(node_id = %self.id, by = %identity.address(), "delegation node revoked");
        Ok(receipt)
    }

    /// Whether the ledger holds this node, unrevoked.
    pub async fn verify(&self, ledger: &dyn Ledger) -> Result<bool, CredentialError> {
        Ok(Self::query(ledger, &self.id).await?.is_some_and(|stored| {
            !stored.revoked
                && stored.account == self.account
                && stored.permissions == self.permissions
        }))
    }
}
