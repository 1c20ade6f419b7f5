//! Integration test: zero-knowledge attestation, presentation and
//! accumulator-based revocation against the deterministic test engine.

use serde_json::json;
use tessera_core::opaque::{Accumulator, AttesterPublicKey};
use tessera_core::{AttestationState, PresentationConfig};
use tessera_credentials::{
    AttestationRecord, CType, Credential, InMemoryLedger, Ledger, PrivacyEngine,
};
use tessera_identity::{AttesterIdentity, Identity};
use tessera_integration_tests::{
    init_test_logging, ralfi_claim, register_person_ctype, transmit, TestPrivacyEngine,
};
use tessera_messaging::{MessageBody, MessageBodyType};
use tessera_protocol::attester::{self, SubmitOptions};
use tessera_protocol::claimer::{self, PresentationPrivacy, PrivacyContext, RequestOptions};
use tessera_protocol::verifier::{
    latest_accumulators, verify_presentation, PresentationRequestBuilder, VerifierPrivacy,
};
use tessera_protocol::{AttesterAttestationSession, ProtocolError, RevocationHandle};

struct World {
    engine: TestPrivacyEngine,
    ledger: InMemoryLedger,
    attester: AttesterIdentity,
    attester_key: AttesterPublicKey,
    claimer: Identity,
    verifier: Identity,
    ctype: CType,
}

async fn world() -> World {
    init_test_logging();
    let engine = TestPrivacyEngine::new();
    let ledger = InMemoryLedger::new();
    let attester = attester::create_attester(Identity::generate(), &engine)
        .await
        .unwrap();
    attester::publish_accumulator(&attester, &ledger, &engine)
        .await
        .unwrap();
    let attester_key = attester.capability().unwrap().public_key.clone();
    let ctype = register_person_ctype(&ledger, attester.identity()).await;
    World {
        engine,
        ledger,
        attester,
        attester_key,
        claimer: Identity::generate(),
        verifier: Identity::generate(),
        ctype,
    }
}

/// Initiate, request, submit and build with the PE path throughout.
async fn issue_pe(w: &World) -> (Credential, RevocationHandle) {
    let engine: &dyn PrivacyEngine = &w.engine;

    let (init, mut attester_session) =
        attester::initiate_attestation(&w.attester, &w.claimer.public_identity(), engine)
            .await
            .unwrap();
    assert_eq!(attester_session.state(), AttestationState::Initiated);
    let init = transmit(&init, w.attester.identity(), &w.claimer);

    let (request, mut claimer_session) = claimer::request_attestation(
        ralfi_claim(&w.ctype, &w.claimer),
        &w.claimer,
        &w.attester.public_identity(),
        RequestOptions {
            initiation: Some(&init),
            privacy: Some(PrivacyContext {
                engine,
                attester_key: &w.attester_key,
            }),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(claimer_session.is_privacy_enhanced());
    let request = transmit(&request, &w.claimer, w.attester.identity());

    let (handle, submit) = attester::submit_attestation(
        &w.attester,
        &mut attester_session,
        &request,
        &w.ledger,
        Some(engine),
        SubmitOptions {
            force_pe: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(handle.witness.is_some());
    let submit = transmit(&submit, w.attester.identity(), &w.claimer);

    let credential = claimer::build_credential(&mut claimer_session, &submit, Some(engine))
        .await
        .unwrap();
    assert!(credential.is_privacy_enhanced());
    (credential, handle)
}

/// Ask for `age` with PE allowed, answer with the PE path and verify.
async fn present_pe(w: &World, credential: Credential) -> tessera_protocol::PresentationOutcome {
    let engine: &dyn PrivacyEngine = &w.engine;
    let (request, mut verifier_session) = PresentationRequestBuilder::new()
        .request_properties(w.ctype.hash, ["age"])
        .allow_pe(true)
        .finalize(&w.verifier, &w.claimer.public_identity(), Some(engine))
        .await
        .unwrap();
    let request = transmit(&request, &w.verifier, &w.claimer);

    let keys = [w.attester_key.clone()];
    let answer = claimer::create_presentation(
        &request,
        &[credential],
        &w.claimer,
        &PresentationConfig::default(),
        Some(PresentationPrivacy {
            engine,
            attester_keys: &keys,
        }),
    )
    .await
    .unwrap();
    assert_eq!(answer.body_type(), MessageBodyType::SubmitClaimsForCTypesPe);
    let answer = transmit(&answer, &w.claimer, &w.verifier);

    let accumulators =
        latest_accumulators(&w.ledger, &[w.attester.identity().address().clone()])
            .await
            .unwrap();
    verify_presentation(
        &mut verifier_session,
        &answer,
        &w.ledger,
        Some(VerifierPrivacy {
            engine,
            accumulators: &accumulators,
            attester_keys: &keys,
        }),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_pe_issuance_and_presentation() {
    let w = world().await;
    let (credential, _) = issue_pe(&w).await;

    // The public half stays usable on its own.
    assert!(credential.verify(&w.ledger).await.unwrap());

    let outcome = present_pe(&w, credential).await;
    assert!(outcome.verified);
    assert_eq!(outcome.claims, vec![json!({ "age": 12 })]);
}

#[tokio::test]
async fn test_pe_revocation_updates_accumulator() {
    let w = world().await;
    let (credential, handle) = issue_pe(&w).await;

    let engine: &dyn PrivacyEngine = &w.engine;
    attester::revoke_attestation(&w.attester, &handle, &w.ledger, Some(engine))
        .await
        .unwrap();

    let latest = w
        .ledger
        .query_accumulator(w.attester.identity().address())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.index, 1);
    assert!(!credential.verify(&w.ledger).await.unwrap());

    let outcome = present_pe(&w, credential).await;
    assert!(!outcome.verified);
}

#[tokio::test]
async fn test_required_pe_against_plain_verifier() {
    let w = world().await;
    let (credential, _) = issue_pe(&w).await;

    let (request, _) = PresentationRequestBuilder::new()
        .request_properties(w.ctype.hash, ["age"])
        .finalize(&w.verifier, &w.claimer.public_identity(), None)
        .await
        .unwrap();
    let config = PresentationConfig {
        require_pe: true,
        ..Default::default()
    };
    let result =
        claimer::create_presentation(&request, &[credential], &w.claimer, &config, None).await;
    assert!(matches!(result, Err(ProtocolError::PeMismatch(_))));
}

#[tokio::test]
async fn test_pe_credential_presented_publicly() {
    let w = world().await;
    let (credential, _) = issue_pe(&w).await;

    // Without PE allowed the claimer falls back to selective disclosure.
    let (request, mut verifier_session) = PresentationRequestBuilder::new()
        .request_properties(w.ctype.hash, ["age"])
        .finalize(&w.verifier, &w.claimer.public_identity(), None)
        .await
        .unwrap();
    let answer = claimer::create_presentation(
        &request,
        &[credential],
        &w.claimer,
        &PresentationConfig::default(),
        None,
    )
    .await
    .unwrap();
    assert_eq!(answer.body_type(), MessageBodyType::SubmitClaimsForCTypesPublic);

    let outcome = verify_presentation(&mut verifier_session, &answer, &w.ledger, None)
        .await
        .unwrap();
    assert!(outcome.verified);
}

#[tokio::test]
async fn test_forced_pe_without_session() {
    let w = world().await;
    let (request, _) = claimer::request_attestation(
        ralfi_claim(&w.ctype, &w.claimer),
        &w.claimer,
        &w.attester.public_identity(),
        RequestOptions::default(),
    )
    .await
    .unwrap();

    let mut session = AttesterAttestationSession::new();
    let engine: &dyn PrivacyEngine = &w.engine;
    let result = attester::submit_attestation(
        &w.attester,
        &mut session,
        &request,
        &w.ledger,
        Some(engine),
        SubmitOptions {
            force_pe: true,
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(result, Err(ProtocolError::AttestationSessionMissing)));
    // Nothing was committed, so a plain submit is still possible.
    assert_eq!(session.state(), AttestationState::Idle);
}

#[tokio::test]
async fn test_missing_accumulator() {
    init_test_logging();
    let engine = TestPrivacyEngine::new();
    let ledger = InMemoryLedger::new();
    let attester = attester::create_attester(Identity::generate(), &engine)
        .await
        .unwrap();
    let attester_key = attester.capability().unwrap().public_key.clone();
    let claimer = Identity::generate();
    let ctype = register_person_ctype(&ledger, attester.identity()).await;

    let (init, mut attester_session) =
        attester::initiate_attestation(&attester, &claimer.public_identity(), &engine)
            .await
            .unwrap();
    let (request, _) = claimer::request_attestation(
        ralfi_claim(&ctype, &claimer),
        &claimer,
        &attester.public_identity(),
        RequestOptions {
            initiation: Some(&init),
            privacy: Some(PrivacyContext {
                engine: &engine,
                attester_key: &attester_key,
            }),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let result = attester::submit_attestation(
        &attester,
        &mut attester_session,
        &request,
        &ledger,
        Some(&engine),
        SubmitOptions::default(),
    )
    .await;
    assert!(matches!(result, Err(ProtocolError::AccumulatorMissing(_))));
    assert_eq!(attester_session.state(), AttestationState::Initiated);
}

#[tokio::test]
async fn test_refused_issuance_leaves_no_record() {
    let w = world().await;
    let engine: &dyn PrivacyEngine = &w.engine;

    // Latest accumulator belongs to some other attester key.
    let foreign = Accumulator::new(json!({ "attester": { "attester": "elsewhere" }, "revoked": [] }));
    w.ledger
        .store_accumulator(&foreign, 1, w.attester.identity())
        .await
        .unwrap();

    let (init, mut attester_session) =
        attester::initiate_attestation(&w.attester, &w.claimer.public_identity(), engine)
            .await
            .unwrap();
    let (request, _) = claimer::request_attestation(
        ralfi_claim(&w.ctype, &w.claimer),
        &w.claimer,
        &w.attester.public_identity(),
        RequestOptions {
            initiation: Some(&init),
            privacy: Some(PrivacyContext {
                engine,
                attester_key: &w.attester_key,
            }),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let request = transmit(&request, &w.claimer, w.attester.identity());

    let refused = attester::submit_attestation(
        &w.attester,
        &mut attester_session,
        &request,
        &w.ledger,
        Some(engine),
        SubmitOptions::default(),
    )
    .await;
    assert!(matches!(refused, Err(ProtocolError::Privacy(_))));
    let MessageBody::RequestAttestationForClaim(content) = &request.body else {
        panic!("expected a request, got {}", request.body_type());
    };
    let root_hash = content.request.root_hash;
    assert!(AttestationRecord::query(&w.ledger, &root_hash)
        .await
        .unwrap()
        .is_none());
    assert_eq!(attester_session.state(), AttestationState::Initiated);

    // A fresh accumulator makes the same step succeed on the same session.
    attester::publish_accumulator(&w.attester, &w.ledger, engine)
        .await
        .unwrap();
    let (handle, _) = attester::submit_attestation(
        &w.attester,
        &mut attester_session,
        &request,
        &w.ledger,
        Some(engine),
        SubmitOptions::default(),
    )
    .await
    .unwrap();
    assert!(handle.witness.is_some());
    assert_eq!(handle.attestation.claim_hash, root_hash);
    assert_eq!(attester_session.state(), AttestationState::Submitted);
}
