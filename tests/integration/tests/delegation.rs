//! Integration test: attesting under a delegation tree.

use tessera_core::Permissions;
use tessera_credentials::{
    AttestationRecord, CType, CredentialError, DelegationNode, DelegationRootNode, InMemoryLedger,
    LedgerError,
};
use tessera_identity::{AttesterIdentity, Identity};
use tessera_integration_tests::{
    attest_delegation, init_test_logging, ralfi_claim, register_person_ctype, transmit,
};
use tessera_protocol::attester::{self, SubmitOptions};
use tessera_protocol::claimer::{self, RequestOptions};
use tessera_protocol::delegation::{
    accept_delegation, created_delegation, finalize_delegation, propose_delegation,
};
use tessera_protocol::{AttesterAttestationSession, ProtocolError, RevocationHandle};

fn ledger_error(result: Result<impl Sized, ProtocolError>) -> LedgerError {
    match result {
        Err(ProtocolError::Credential(CredentialError::Ledger(e))) => e,
        Err(other) => panic!("expected a ledger error, got {other}"),
        Ok(_) => panic!("expected a ledger error, got success"),
    }
}

/// Claimer asks `delegate` to attest under `node`, and the attestation is
/// stored with the node's id.
async fn attest_under(
    ledger: &InMemoryLedger,
    delegate: &AttesterIdentity,
    claimer: &Identity,
    ctype: &CType,
    node: &DelegationNode,
) -> Result<RevocationHandle, ProtocolError> {
    let (request, _) = claimer::request_attestation(
        ralfi_claim(ctype, claimer),
        claimer,
        &delegate.public_identity(),
        RequestOptions {
            delegation_id: Some(node.id),
            ..Default::default()
        },
    )
    .await?;
    let request = transmit(&request, claimer, delegate.identity());
    attester::submit_attestation(
        delegate,
        &mut AttesterAttestationSession::new(),
        &request,
        ledger,
        None,
        SubmitOptions::default(),
    )
    .await
    .map(|(handle, _)| handle)
}

// =========================================================================
// Scenario D: delegated attestation
// =========================================================================

#[tokio::test]
async fn test_delegated_attestation_and_revocation_rights() {
    init_test_logging();
    let ledger = InMemoryLedger::new();
    let root_owner = Identity::generate();
    let delegate = AttesterIdentity::new(Identity::generate());
    let claimer = Identity::generate();

    let ctype = register_person_ctype(&ledger, &root_owner).await;
    let (_, node) = attest_delegation(&ledger, &ctype, &root_owner, delegate.identity()).await;

    let handle = attest_under(&ledger, &delegate, &claimer, &ctype, &node)
        .await
        .unwrap();
    assert_eq!(handle.attestation.delegation_id, Some(node.id));
    assert_eq!(&handle.attestation.owner, delegate.identity().address());

    let outsider = Identity::generate();
    let denied = handle.attestation.revoke(&ledger, &outsider).await;
    assert!(matches!(
        denied,
        Err(CredentialError::Ledger(LedgerError::NotPermittedToRevoke(account)))
            if &account == outsider.address()
    ));

    handle.attestation.revoke(&ledger, &root_owner).await.unwrap();
    assert!(!AttestationRecord::check_validity(&ledger, &handle.attestation.claim_hash)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_node_without_attest_permission() {
    init_test_logging();
    let ledger = InMemoryLedger::new();
    let root_owner = Identity::generate();
    let delegate = AttesterIdentity::new(Identity::generate());
    let claimer = Identity::generate();

    let ctype = register_person_ctype(&ledger, &root_owner).await;
    let root = DelegationRootNode::new(ctype.hash, root_owner.address().clone());
    root.store(&ledger, &root_owner).await.unwrap();
    let node = DelegationNode::new(
        root.id,
        None,
        delegate.identity().address().clone(),
        Permissions::DELEGATE,
    );
    node.store(&ledger, &root_owner, &node.authorize(&root_owner))
        .await
        .unwrap();

    let result = attest_under(&ledger, &delegate, &claimer, &ctype, &node).await;
    assert!(matches!(
        ledger_error(result),
        LedgerError::NotPermittedToAttest { .. }
    ));
}

#[tokio::test]
async fn test_revoked_root_blocks_attestation() {
    init_test_logging();
    let ledger = InMemoryLedger::new();
    let root_owner = Identity::generate();
    let delegate = AttesterIdentity::new(Identity::generate());
    let claimer = Identity::generate();

    let ctype = register_person_ctype(&ledger, &root_owner).await;
    let (root, node) = attest_delegation(&ledger, &ctype, &root_owner, delegate.identity()).await;
    root.revoke(&ledger, &root_owner).await.unwrap();

    // Cascades to the node.
    assert!(!node.verify(&ledger).await.unwrap());
    assert!(DelegationNode::query(&ledger, &node.id)
        .await
        .unwrap()
        .is_some_and(|stored| stored.revoked));

    let result = attest_under(&ledger, &delegate, &claimer, &ctype, &node).await;
    assert_eq!(ledger_error(result), LedgerError::DelegationRevoked(node.id));
}

// =========================================================================
// Delegation acceptance over envelopes
// =========================================================================

#[tokio::test]
async fn test_delegation_exchange_then_attest() {
    init_test_logging();
    let ledger = InMemoryLedger::new();
    let root_owner = Identity::generate();
    let delegate = AttesterIdentity::new(Identity::generate());
    let claimer = Identity::generate();

    let ctype = register_person_ctype(&ledger, &root_owner).await;
    let root = DelegationRootNode::new(ctype.hash, root_owner.address().clone());
    root.store(&ledger, &root_owner).await.unwrap();
    let proposed = DelegationNode::new(
        root.id,
        None,
        delegate.identity().address().clone(),
        Permissions::ATTEST,
    );

    let proposal =
        propose_delegation(&root_owner, &delegate.public_identity(), proposed, None).unwrap();
    let proposal = transmit(&proposal, &root_owner, delegate.identity());
    let acceptance = accept_delegation(delegate.identity(), &proposal).unwrap();
    let acceptance = transmit(&acceptance, delegate.identity(), &root_owner);
    let (node, inform) = finalize_delegation(&root_owner, &acceptance, &ledger)
        .await
        .unwrap();
    let inform = transmit(&inform, &root_owner, delegate.identity());
    assert_eq!(created_delegation(&inform).unwrap(), node.id);

    let children = root.get_children(&ledger).await.unwrap();
    assert_eq!(children, vec![node.clone()]);

    let handle = attest_under(&ledger, &delegate, &claimer, &ctype, &node)
        .await
        .unwrap();
    assert!(handle.attestation.verify(&ledger).await.unwrap());
}

#[tokio::test]
async fn test_sub_delegate_revocation_cascade() {
    init_test_logging();
    let ledger = InMemoryLedger::new();
    let root_owner = Identity::generate();
    let middle = Identity::generate();
    let leaf = Identity::generate();

    let ctype = register_person_ctype(&ledger, &root_owner).await;
    let root = DelegationRootNode::new(ctype.hash, root_owner.address().clone());
    root.store(&ledger, &root_owner).await.unwrap();
    let upper = DelegationNode::new(
        root.id,
        None,
        middle.address().clone(),
        Permissions::DELEGATE,
    );
    upper
        .store(&ledger, &root_owner, &upper.authorize(&root_owner))
        .await
        .unwrap();
    let lower = DelegationNode::new(
        root.id,
        Some(upper.id),
        leaf.address().clone(),
        Permissions::ATTEST,
    );
    lower
        .store(&ledger, &middle, &lower.authorize(&middle))
        .await
        .unwrap();
    assert_eq!(lower.get_parent(&ledger).await.unwrap(), Some(upper.clone()));

    // The leaf cannot revoke above itself.
    let denied = upper.revoke(&ledger, &leaf).await;
    assert!(matches!(
        denied,
        Err(CredentialError::Ledger(LedgerError::NotPermittedToRevoke(_)))
    ));

    upper.revoke(&ledger, &root_owner).await.unwrap();
    assert!(!upper.verify(&ledger).await.unwrap());
    assert!(!lower.verify(&ledger).await.unwrap());
    assert!(root.verify(&ledger).await.unwrap());
}
