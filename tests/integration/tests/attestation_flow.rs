//! Integration test: plain attestation and presentation across crates.
//!
//! Claimer, attester and verifier exchange every message through sealed
//! envelopes and anchor to one shared in-memory ledger.

use serde_json::json;
use tessera_core::{AttestationState, PresentationConfig, PresentationState};
use tessera_credentials::{AttestationRecord, Credential, InMemoryLedger};
use tessera_identity::{AttesterIdentity, Identity};
use tessera_integration_tests::{
    disclosed_keys, init_test_logging, ralfi_claim, register_person_ctype, transmit,
};
use tessera_messaging::{MessageBody, MessageBodyType};
use tessera_protocol::attester::{self, SubmitOptions};
use tessera_protocol::claimer::{self, RequestOptions};
use tessera_protocol::verifier::{verify_presentation, PresentationRequestBuilder};
use tessera_protocol::{AttesterAttestationSession, ProtocolError, RevocationHandle};

struct Parties {
    ledger: InMemoryLedger,
    attester: AttesterIdentity,
    claimer: Identity,
    verifier: Identity,
}

fn parties() -> Parties {
    init_test_logging();
    Parties {
        ledger: InMemoryLedger::new(),
        attester: AttesterIdentity::new(Identity::generate()),
        claimer: Identity::generate(),
        verifier: Identity::generate(),
    }
}

/// Scenario A up to the built credential.
async fn issue(p: &Parties) -> (Credential, RevocationHandle) {
    let ctype = register_person_ctype(&p.ledger, p.attester.identity()).await;

    let (request_msg, mut claimer_session) = claimer::request_attestation(
        ralfi_claim(&ctype, &p.claimer),
        &p.claimer,
        &p.attester.public_identity(),
        RequestOptions::default(),
    )
    .await
    .expect("request built");
    let request_msg = transmit(&request_msg, &p.claimer, p.attester.identity());

    let mut attester_session = AttesterAttestationSession::new();
    let (handle, submit_msg) = attester::submit_attestation(
        &p.attester,
        &mut attester_session,
        &request_msg,
        &p.ledger,
        None,
        SubmitOptions::default(),
    )
    .await
    .expect("attestation submitted");
    assert_eq!(attester_session.state(), AttestationState::Submitted);

    let submit_msg = transmit(&submit_msg, p.attester.identity(), &p.claimer);
    let credential = claimer::build_credential(&mut claimer_session, &submit_msg, None)
        .await
        .expect("credential built");
    assert_eq!(claimer_session.state(), AttestationState::CredentialBuilt);
    (credential, handle)
}

// =========================================================================
// Scenario A: plain happy path
// =========================================================================

#[tokio::test]
async fn test_plain_issuance_verifies() {
    let p = parties();
    let (credential, handle) = issue(&p).await;

    assert!(credential.verify(&p.ledger).await.unwrap());
    assert_eq!(credential.owner(), Some(p.claimer.address()));
    assert_eq!(credential.attester(), p.attester.identity().address());
    assert_eq!(credential.attributes()["name"], json!("Ralfi"));
    assert_eq!(credential.attributes()["age"], json!(12));
    assert!(handle.witness.is_none());
}

#[tokio::test]
async fn test_credential_survives_compression() {
    let p = parties();
    let (credential, _) = issue(&p).await;

    let restored = Credential::decompress(credential.compress());
    assert_eq!(restored, credential);
    assert!(restored.verify(&p.ledger).await.unwrap());
}

// =========================================================================
// Scenario B: selective disclosure
// =========================================================================

#[tokio::test]
async fn test_selective_disclosure() {
    let p = parties();
    let (credential, _) = issue(&p).await;

    let mut presentation = credential.create_presentation(&["age"], true).unwrap();
    assert_eq!(presentation.claim.contents_value(), json!({ "age": 12 }));
    assert!(presentation.verify_data().unwrap());
    assert_eq!(presentation.root_hash, credential.request.root_hash);

    presentation.claim.contents.remove("age");
    assert!(!presentation.verify_data().unwrap());
}

#[tokio::test]
async fn test_presentation_exchange() {
    let p = parties();
    let (credential, _) = issue(&p).await;

    let (request_msg, mut verifier_session) = PresentationRequestBuilder::new()
        .request_properties(*credential.ctype_hash(), ["age"])
        .finalize(&p.verifier, &p.claimer.public_identity(), None)
        .await
        .unwrap();
    let request_msg = transmit(&request_msg, &p.verifier, &p.claimer);

    let answer = claimer::create_presentation(
        &request_msg,
        &[credential],
        &p.claimer,
        &PresentationConfig::default(),
        None,
    )
    .await
    .unwrap();
    assert_eq!(answer.body_type(), MessageBodyType::SubmitClaimsForCTypesPublic);
    let answer = transmit(&answer, &p.claimer, &p.verifier);

    if let MessageBody::SubmitClaimsForCTypesPublic(presentations) = &answer.body {
        assert_eq!(disclosed_keys(&presentations[0]), vec!["age"]);
    }
    let outcome = verify_presentation(&mut verifier_session, &answer, &p.ledger, None)
        .await
        .unwrap();
    assert!(outcome.verified);
    assert_eq!(outcome.claims, vec![json!({ "age": 12 })]);
    assert_eq!(verifier_session.state(), PresentationState::Verified);
}

#[tokio::test]
async fn test_presentation_with_extra_property_fails() {
    let p = parties();
    let (credential, _) = issue(&p).await;

    let (_, mut verifier_session) = PresentationRequestBuilder::new()
        .request_properties(*credential.ctype_hash(), ["age"])
        .finalize(&p.verifier, &p.claimer.public_identity(), None)
        .await
        .unwrap();

    // The claimer answers a wider request than the verifier actually made.
    let (wider, _) = PresentationRequestBuilder::new()
        .request_properties(*credential.ctype_hash(), ["age", "name"])
        .finalize(&p.verifier, &p.claimer.public_identity(), None)
        .await
        .unwrap();
    let answer = claimer::create_presentation(
        &wider,
        &[credential],
        &p.claimer,
        &PresentationConfig::default(),
        None,
    )
    .await
    .unwrap();

    let outcome = verify_presentation(&mut verifier_session, &answer, &p.ledger, None)
        .await
        .unwrap();
    assert!(!outcome.verified);
}

#[tokio::test]
async fn test_relayed_presentation_rejected() {
    let p = parties();
    let (credential, _) = issue(&p).await;

    let relay = Identity::generate();
    let (_, mut verifier_session) = PresentationRequestBuilder::new()
        .request_properties(*credential.ctype_hash(), ["age"])
        .finalize(&p.verifier, &relay.public_identity(), None)
        .await
        .unwrap();
    let presentation = credential
        .create_presentation_credential(&["age"], false)
        .unwrap();
    let forwarded = tessera_messaging::Message::new(
        MessageBody::SubmitClaimsForCTypesPublic(vec![presentation]),
        relay.address(),
        p.verifier.address(),
    );
    let forwarded = transmit(&forwarded, &relay, &p.verifier);

    let result = verify_presentation(&mut verifier_session, &forwarded, &p.ledger, None).await;
    assert!(matches!(result, Err(ProtocolError::Envelope(_))));
}

// =========================================================================
// Scenario C: revocation
// =========================================================================

#[tokio::test]
async fn test_revocation_invalidates_credential() {
    let p = parties();
    let (credential, handle) = issue(&p).await;

    attester::revoke_attestation(&p.attester, &handle, &p.ledger, None)
        .await
        .unwrap();

    assert!(!credential.verify(&p.ledger).await.unwrap());
    let stored = AttestationRecord::query(&p.ledger, credential.hash())
        .await
        .unwrap()
        .expect("record kept after revocation");
    assert!(stored.revoked);
    assert!(!AttestationRecord::check_validity(&p.ledger, credential.hash())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_revoking_twice_fails() {
    let p = parties();
    let (_, handle) = issue(&p).await;

    attester::revoke_attestation(&p.attester, &handle, &p.ledger, None)
        .await
        .unwrap();
    let again = attester::revoke_attestation(&p.attester, &handle, &p.ledger, None).await;
    assert!(matches!(
        again,
        Err(ProtocolError::Credential(
            tessera_credentials::CredentialError::Ledger(
                tessera_credentials::LedgerError::AlreadyRevoked(_)
            )
        ))
    ));
}

// =========================================================================
// Scenario E: protocol mismatch
// =========================================================================

#[tokio::test]
async fn test_submit_fed_as_initiation() {
    let p = parties();
    let ctype = register_person_ctype(&p.ledger, p.attester.identity()).await;
    let (request_msg, _) = claimer::request_attestation(
        ralfi_claim(&ctype, &p.claimer),
        &p.claimer,
        &p.attester.public_identity(),
        RequestOptions::default(),
    )
    .await
    .unwrap();
    let (_, submit_msg) = attester::submit_attestation(
        &p.attester,
        &mut AttesterAttestationSession::new(),
        &request_msg,
        &p.ledger,
        None,
        SubmitOptions::default(),
    )
    .await
    .unwrap();

    let result = claimer::request_attestation(
        ralfi_claim(&ctype, &p.claimer),
        &p.claimer,
        &p.attester.public_identity(),
        RequestOptions {
            initiation: Some(&submit_msg),
            ..Default::default()
        },
    )
    .await;
    match result {
        Err(ProtocolError::MessageTypeMismatch { got, expected }) => {
            assert_eq!(got, MessageBodyType::SubmitAttestationForClaim);
            assert_eq!(expected, MessageBodyType::InitiateAttestation);
        }
        other => panic!("expected MessageTypeMismatch, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_rejected_request_is_not_attested() {
    let p = parties();
    let ctype = register_person_ctype(&p.ledger, p.attester.identity()).await;
    let (request_msg, _) = claimer::request_attestation(
        ralfi_claim(&ctype, &p.claimer),
        &p.claimer,
        &p.attester.public_identity(),
        RequestOptions::default(),
    )
    .await
    .unwrap();

    let mut session = AttesterAttestationSession::new();
    let reply = attester::reject_attestation(&p.attester, &mut session, &request_msg).unwrap();
    let reply = transmit(&reply, p.attester.identity(), &p.claimer);
    let MessageBody::RejectAttestationForClaim(root_hash) = &reply.body else {
        panic!("expected rejection, got {}", reply.body_type());
    };
    assert!(AttestationRecord::query(&p.ledger, root_hash)
        .await
        .unwrap()
        .is_none());

    let late = attester::submit_attestation(
        &p.attester,
        &mut session,
        &request_msg,
        &p.ledger,
        None,
        SubmitOptions::default(),
    )
    .await;
    assert!(matches!(late, Err(ProtocolError::InvalidStateTransition(_))));
}
