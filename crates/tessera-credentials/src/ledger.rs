use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_core::opaque::Accumulator;
use tessera_core::{Address, CTypeHash, DelegationId, Digest};
use tessera_crypto::Signature;
use tessera_identity::Identity;

use crate::attestation::AttestationRecord;
use crate::delegation::{DelegationNode, DelegationRootNode};
use crate::error::LedgerError;

/// Acknowledgement of an accepted ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Position of the write in the ledger's total order.
    pub sequence: u64,
    pub signer: Address,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// An accumulator version published by an attester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedAccumulator {
    pub index: u64,
    pub accumulator: Accumulator,
}

/// The shared ledger the protocol anchors to.
///
/// Handles are constructed by the caller and passed by reference into
/// every operation that reads or writes. Implementations enforce the
/// chain's authorization rules and report violations as [`LedgerError`].
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn store_ctype(
        &self,
        ctype_hash: &CTypeHash,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError>;

    /// Owner of a registered CType.
    async fn query_ctype(&self, ctype_hash: &CTypeHash) -> Result<Option<Address>, LedgerError>;

    async fn store_attestation(
        &self,
        attestation: &AttestationRecord,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError>;

    async fn query_attestation(
        &self,
        claim_hash: &Digest,
    ) -> Result<Option<AttestationRecord>, LedgerError>;

    async fn revoke_attestation(
        &self,
        claim_hash: &Digest,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError>;

    async fn store_delegation_root(
        &self,
        root: &DelegationRootNode,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError>;

    async fn query_delegation_root(
        &self,
        id: &DelegationId,
    ) -> Result<Option<DelegationRootNode>, LedgerError>;

    /// Revoke a root together with every node below it.
    async fn revoke_delegation_root(
        &self,
        id: &DelegationId,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError>;

    /// Store a node. `parent_signature` must be the parent authority's
    /// signature over the node's hash.
    async fn store_delegation_node(
        &self,
        node: &DelegationNode,
        parent_signature: &Signature,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError>;

    async fn query_delegation_node(
        &self,
        id: &DelegationId,
    ) -> Result<Option<DelegationNode>, LedgerError>;

    /// Direct children of a root or node.
    async fn query_delegation_children(
        &self,
        id: &DelegationId,
    ) -> Result<Vec<DelegationNode>, LedgerError>;

    /// Revoke a node together with its descendants.
    async fn revoke_delegation_node(
        &self,
        id: &DelegationId,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError>;

    /// Publish the signer's next accumulator version.
    ///
    /// `expected_index` must equal the number of versions already
    /// published, otherwise the write is rejected as stale.
    async fn store_accumulator(
        &self,
        accumulator: &Accumulator,
        expected_index: u64,
        signer: &Identity,
    ) -> Result<Receipt, LedgerError>;

    /// Latest accumulator version of `attester`.
    async fn query_accumulator(
        &self,
        attester: &Address,
    ) -> Result<Option<IndexedAccumulator>, LedgerError>;
}
