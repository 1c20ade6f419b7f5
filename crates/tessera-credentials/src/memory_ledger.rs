use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_core::opaque::Accumulator;
use tessera_core::{now_millis, Address, CTypeHash, DelegationId, Digest, Permissions};
use tessera_crypto::Signature;
use tessera_identity::Identity;

use crate::attestation::AttestationRecord;
use crate::delegation::{DelegationNode, DelegationRootNode};
use crate::error::LedgerError;
use crate::ledger::{IndexedAccumulator, Ledger, Receipt};

/// In-process ledger backed by `DashMap`s.
///
/// Enforces the same authorization rules a chain would:
/// - attestations need a registered CType and, under delegation, an
///   unrevoked ATTEST node owned by the attester whose root fixes the CType
/// - revocation is open to the attester and to any account on the
///   delegation path above it
/// - revoking a delegation revokes its descendants but no attestations
pub struct InMemoryLedger {
    ctypes: DashMap<CTypeHash, Address>,
    attestations: DashMap<Digest, AttestationRecord>,
    roots: DashMap<DelegationId, DelegationRootNode>,
    nodes: DashMap<DelegationId, DelegationNode>,
    accumulators: DashMap<Address, Vec<Accumulator>>,
    sequence: AtomicU64,
}

impl InMemoryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self {
            ctypes: DashMap::new(),
            attestations: DashMap::new(),
            roots: DashMap::new(),
            nodes: DashMap::new(),
            accumulators: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    fn receipt(&self, signer: &Identity) -> Receipt {
        Receipt {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            signer: signer.address().clone(),
            timestamp: now_millis(),
        }
    }

    /// Accounts on the path from `node_id` up to and including its root.
    fn authority_chain(&self, node_id: &DelegationId) -> Result<Vec<Address>, LedgerError> {
        let mut chain = Vec::new();
        let mut current = Some(*node_id);
        let mut root_id = None;
        while let Some(id) = current {
            let node = self
                .nodes
                .get(&id)
                .map(|entry| entry.clone())
                .ok_or_else(|| LedgerError::NotFound(format!("delegation node {}", id)))?;
            chain.push(node.account);
            root_id = Some(node.root_id);
            current = node.parent_id;
        }
        if let Some(root_id) = root_id {
            let root = self
                .roots
                .get(&root_id)
                .map(|entry| entry.account.clone())
                .ok_or_else(|| LedgerError::NotFound(format!("delegation root {}", root_id)))?;
            chain.push(root);
        }
        Ok(chain)
    }

    /// Whether the node or anything above it is revoked.
    fn chain_revoked(&self, node: &DelegationNode) -> bool {
        if self.roots.get(&node.root_id).map_or(true, |root| root.revoked) {
            return true;
        }
        let mut current = Some(node.id);
        while let Some(id) = current {
            match self.nodes.get(&id).map(|entry| (entry.revoked, entry.parent_id)) {
                Some((false, parent)) => current = parent,
                _ => return true,
            }
        }
        false
    }

    fn check_delegated_attester(
        &self,
        attestation: &AttestationRecord,
        delegation_id: &DelegationId,
        signer: &Address,
    ) -> Result<(), LedgerError> {
        let not_permitted = |reason: &str| LedgerError::NotPermittedToAttest {
            account: signer.clone(),
            reason: reason.to_string(),
        };

        let node = self
            .nodes
            .get(delegation_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| not_permitted("delegation node not found"))?;
        if self.chain_revoked(&node) {
            return Err(LedgerError::DelegationRevoked(*delegation_id));
        }
        if &node.account != signer {
            return Err(not_permitted("delegation node belongs to another account"));
        }
        if !node.permissions.contains(Permissions::ATTEST) {
            return Err(not_permitted("delegation node lacks ATTEST"));
        }
        let root_ctype = self.roots.get(&node.root_id).map(|root| root.ctype_hash);
        if root_ctype != Some(attestation.ctype_hash) {
            return Err(not_permitted("delegation root is for another CType"));
        }
        Ok(())
    }

    /// Ids of every node below `parent`, breadth first.
    fn descendants(&self, parent: &DelegationId) -> Vec<DelegationId> {
        let mut found = Vec::new();
        let mut frontier = vec![*parent];
        while let Some(id) = frontier.pop() {
            let children: Vec<DelegationId> = self
                .nodes
                .iter()
                .filter(|entry| entry.parent_id == Some(id))
                .map(|entry| entry.id)
                .collect();
            frontier.extend(children.iter().copied());
            found.extend(children);
        }
        found
    }

    fn revoke_nodes(&self, ids: &[DelegationId]) {
        for id in ids {
            if let Some(mut node) = self.nodes.get_mut(id) {
                node.revoked = true;
            }
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn store_ctype(
        &self,
        ctype_hash: &CTypeHash,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError> {
        match self.ctypes.entry(*ctype_hash) {
            Entry::Occupied(_) => Err(LedgerError::AlreadyExists(format!("CType {}", ctype_hash))),
            Entry::Vacant(slot) => {
                slot.insert(signer.address().clone());
                Ok(self.receipt(signer))
            }
        }
    }

    async fn query_ctype(&self, ctype_hash: &CTypeHash) -> Result<Option<Address>, LedgerError> {
        Ok(self.ctypes.get(ctype_hash).map(|entry| entry.clone()))
    }

    async fn store_attestation(
        &self,
        attestation: &AttestationRecord,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError> {
        let account = signer.address();
        if &attestation.owner != account {
            return Err(LedgerError::NotPermittedToAttest {
                account: account.clone(),
                reason: "attestation owner is not the signer".into(),
            });
        }
        if !self.ctypes.contains_key(&attestation.ctype_hash) {
            return Err(LedgerError::CTypeNotFound(attestation.ctype_hash));
        }
        // The entry guard is held until the record is in place.
        let Entry::Vacant(slot) = self.attestations.entry(attestation.claim_hash) else {
            return Err(LedgerError::AlreadyAttested(attestation.claim_hash));
        };
        if let Some(delegation_id) = &attestation.delegation_id {
            self.check_delegated_attester(attestation, delegation_id, account)?;
        }

        let mut record = attestation.clone();
        record.revoked = false;
        slot.insert(record);
        Ok(self.receipt(signer))
    }

    async fn query_attestation(
        &self,
        claim_hash: &Digest,
    ) -> Result<Option<AttestationRecord>, LedgerError> {
        Ok(self.attestations.get(claim_hash).map(|entry| entry.clone()))
    }

    async fn revoke_attestation(
        &self,
        claim_hash: &Digest,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError> {
        let Entry::Occupied(mut slot) = self.attestations.entry(*claim_hash) else {
            return Err(LedgerError::NotFound(format!("attestation {}", claim_hash)));
        };
        let record = slot.get_mut();

        let account = signer.address();
        let permitted = &record.owner == account
            || match &record.delegation_id {
                Some(id) => self.authority_chain(id)?.contains(account),
                None => false,
            };
        if !permitted {
            return Err(LedgerError::NotPermittedToRevoke(account.clone()));
        }
        if record.revoked {
            return Err(LedgerError::AlreadyRevoked(format!("attestation {}", claim_hash)));
        }

        record.revoked = true;
        drop(slot);
        Ok(self.receipt(signer))
    }

    async fn store_delegation_root(
        &self,
        root: &DelegationRootNode,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError> {
        if &root.account != signer.address() {
            return Err(LedgerError::NotPermittedToAttest {
                account: signer.address().clone(),
                reason: "delegation root account is not the signer".into(),
            });
        }
        if self.roots.contains_key(&root.id) || self.nodes.contains_key(&root.id) {
            return Err(LedgerError::AlreadyExists(format!("delegation {}", root.id)));
        }
        let mut stored = root.clone();
        stored.revoked = false;
        self.roots.insert(stored.id, stored);
        Ok(self.receipt(signer))
    }

    async fn query_delegation_root(
        &self,
        id: &DelegationId,
    ) -> Result<Option<DelegationRootNode>, LedgerError> {
        Ok(self.roots.get(id).map(|entry| entry.clone()))
    }

    async fn revoke_delegation_root(
        &self,
        id: &DelegationId,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError> {
        let (account, revoked) = self
            .roots
            .get(id)
            .map(|entry| (entry.account.clone(), entry.revoked))
            .ok_or_else(|| LedgerError::NotFound(format!("delegation root {}", id)))?;
        if &account != signer.address() {
            return Err(LedgerError::NotPermittedToRevoke(signer.address().clone()));
        }
        if revoked {
            return Err(LedgerError::AlreadyRevoked(format!("delegation root {}", id)));
        }

        if let Some(mut root) = self.roots.get_mut(id) {
            root.revoked = true;
        }
        let below: Vec<DelegationId> = self
            .nodes
            .iter()
            .filter(|entry| &entry.root_id == id)
            .map(|entry| entry.id)
            .collect();
        self.revoke_nodes(&below);
        tracing::debug!(root_id = %id, nodes = below.len(), "delegation root revocation cascaded");
        Ok(self.receipt(signer))
    }

    async fn store_delegation_node(
        &self,
        node: &DelegationNode,
        parent_signature: &Signature,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError> {
        if self.nodes.contains_key(&node.id) || self.roots.contains_key(&node.id) {
            return Err(LedgerError::AlreadyExists(format!("delegation {}", node.id)));
        }
        let root = self
            .roots
            .get(&node.root_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| LedgerError::NotFound(format!("delegation root {}", node.root_id)))?;
        if root.revoked {
            return Err(LedgerError::DelegationRevoked(root.id));
        }

        let authority = match &node.parent_id {
            Some(parent_id) => {
                let parent = self
                    .nodes
                    .get(parent_id)
                    .map(|entry| entry.clone())
                    .ok_or_else(|| {
                        LedgerError::NotFound(format!("delegation node {}", parent_id))
                    })?;
                if parent.root_id != node.root_id {
                    return Err(LedgerError::InvalidDelegationSignature(node.id));
                }
                if self.chain_revoked(&parent) {
                    return Err(LedgerError::DelegationRevoked(parent.id));
                }
                if !parent.permissions.contains(Permissions::DELEGATE) {
                    return Err(LedgerError::NotPermittedToAttest {
                        account: parent.account,
                        reason: "parent node lacks DELEGATE".into(),
                    });
                }
                parent.account
            }
            None => root.account,
        };
        if !node.verify_signature(parent_signature, &authority) {
            return Err(LedgerError::InvalidDelegationSignature(node.id));
        }

        let mut stored = node.clone();
        stored.revoked = false;
        self.nodes.insert(stored.id, stored);
        Ok(self.receipt(signer))
    }

    async fn query_delegation_node(
        &self,
        id: &DelegationId,
    ) -> Result<Option<DelegationNode>, LedgerError> {
        Ok(self.nodes.get(id).map(|entry| entry.clone()))
    }

    async fn query_delegation_children(
        &self,
        id: &DelegationId,
    ) -> Result<Vec<DelegationNode>, LedgerError> {
        let is_root = self.roots.contains_key(id);
        let mut children: Vec<DelegationNode> = self
            .nodes
            .iter()
            .filter(|entry| match entry.parent_id {
                Some(parent) => &parent == id,
                None => is_root && &entry.root_id == id,
            })
            .map(|entry| entry.clone())
            .collect();
        children.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(children)
    }

    async fn revoke_delegation_node(
        &self,
        id: &DelegationId,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError> {
        let revoked = self
            .nodes
            .get(id)
            .map(|entry| entry.revoked)
            .ok_or_else(|| LedgerError::NotFound(format!("delegation node {}", id)))?;
        if !self.authority_chain(id)?.contains(signer.address()) {
            return Err(LedgerError::NotPermittedToRevoke(signer.address().clone()));
        }
        if revoked {
            return Err(LedgerError::AlreadyRevoked(format!("delegation node {}", id)));
        }

        let mut affected = self.descendants(id);
        affected.push(*id);
        self.revoke_nodes(&affected);
        tracing::debug!(node_id = %id, nodes = affected.len(), "delegation node revocation cascaded");
        Ok(self.receipt(signer))
    }

    async fn store_accumulator(
        &self,
        accumulator: &Accumulator,
        expected_index: u64,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError> {
        {
            let mut versions = self
                .accumulators
                .entry(signer.address().clone())
                .or_default();
            let actual = versions.len() as u64;
            if actual != expected_index {
                return Err(LedgerError::StaleAccumulator {
                    expected: expected_index,
                    actual,
                });
            }
            versions.push(accumulator.clone());
        }
        Ok(self.receipt(signer))
    }

    async fn query_accumulator(
        &self,
        attester: &Address,
    ) -> Result<Option<IndexedAccumulator>, LedgerError> {
        Ok(self.accumulators.get(attester).and_then(|versions| {
            let last = versions.last()?.clone();
            Some(IndexedAccumulator {
                index: versions.len() as u64 - 1,
                accumulator: last,
            })
        }))
    }
}
