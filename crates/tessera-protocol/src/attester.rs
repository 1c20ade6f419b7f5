use tessera_core::{AttestationEvent, DelegationId};
use tessera_credentials::{AttestationRecord, Ledger, PrivacyEngine, Receipt};
use tessera_identity::{AttesterIdentity, Identity, PublicIdentity};
use tessera_messaging::{Message, MessageBody, MessageBodyType, SubmitAttestation};

use crate::error::ProtocolError;
use crate::session::{AttesterAttestationSession, RevocationHandle};

/// Options for [`submit_attestation`].
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Attest under this delegation node instead of the one in the request.
    pub delegation_id: Option<DelegationId>,
    /// Fail unless a zero-knowledge attestation is issued alongside.
    pub force_pe: bool,
}

/// An attester able to issue zero-knowledge attestations, with fresh PE keys.
pub async fn create_attester(
    identity: Identity,
    engine: &dyn PrivacyEngine,
) -> Result<AttesterIdentity, ProtocolError> {
    let capability = engine.generate_attester_keys().await?;
    tracing::info!(attester = %identity.address(), "attestation capability created");
    Ok(AttesterIdentity::with_capability(identity, capability))
}

/// Create the attester's first accumulator and publish it.
pub async fn publish_accumulator(
    attester: &AttesterIdentity,
    ledger: &dyn Ledger,
    engine: &dyn PrivacyEngine,
) -> Result<Receipt, ProtocolError> {
    let capability = attester.capability()?;
    let accumulator = engine.create_accumulator(capability).await?;
    let address = attester.identity().address();
    let next_index = ledger
        .query_accumulator(address)
        .await?
        .map_or(0, |current| current.index + 1);
    let receipt = ledger
        .store_accumulator(&accumulator, next_index, attester.identity())
        .await?;
    tracing::info!(attester = %address, index = next_index, "accumulator published");
    Ok(receipt)
}

/// Open a PE session and produce the `INITIATE_ATTESTATION` message.
pub async fn initiate_attestation(
    attester: &AttesterIdentity,
    claimer: &PublicIdentity,
    engine: &dyn PrivacyEngine,
) -> Result<(Message, AttesterAttestationSession), ProtocolError> {
    let capability = attester.capability()?;
    let (init_token, pe_session) = engine.start_attestation_session(capability).await?;
    let session = AttesterAttestationSession::initiated(pe_session)?;
    tracing::debug!(
        attester = %attester.identity().address(),
        claimer = %claimer.address,
        "attestation initiated"
    );
    let message = Message::new(
        MessageBody::InitiateAttestation(init_token),
        attester.identity().address(),
        &claimer.address,
    );
    Ok((message, session))
}

/// Attest the request in `message`, store the record on the ledger and
/// answer with `SUBMIT_ATTESTATION_FOR_CLAIM`.
///
/// A zero-knowledge attestation is issued when the session was initiated
/// and the request carries a PE part. That needs `engine`, the attester's
/// capability and a published accumulator.
pub async fn submit_attestation(
    attester: &AttesterIdentity,
    session: &mut AttesterAttestationSession,
    message: &Message,
    ledger: &dyn Ledger,
    engine: Option<&dyn PrivacyEngine>,
    options: SubmitOptions,
) -> Result<(RevocationHandle, Message), ProtocolError> {
    let MessageBody::RequestAttestationForClaim(content) = &message.body else {
        return Err(ProtocolError::mismatch(
            message.body_type(),
            MessageBodyType::RequestAttestationForClaim,
        ));
    };
    message.ensure_owner_is_sender()?;
    let next = session.after(&[AttestationEvent::Request, AttestationEvent::Submit])?;

    let request = &content.request;
    if options.force_pe {
        if session.pe_session().is_none() {
            return Err(ProtocolError::AttestationSessionMissing);
        }
        if request.privacy_enhancement.is_none() {
            return Err(ProtocolError::PeRequestMissing);
        }
    }
    if !request.verify_data()? {
        return Err(ProtocolError::RequestVerificationFailed(request.root_hash));
    }

    let identity = attester.identity();
    let pe_inputs = match (session.pe_session(), request.privacy_enhancement.as_ref()) {
        (Some(pe_session), Some(pe_request)) => {
            let engine = engine.ok_or(ProtocolError::PrivacyEngineMissing)?;
            let capability = attester.capability()?;
            let accumulator = ledger
                .query_accumulator(identity.address())
                .await?
                .ok_or_else(|| ProtocolError::AccumulatorMissing(identity.address().clone()))?;
            Some((engine, capability, pe_session, pe_request, accumulator))
        }
        _ => None,
    };

    let attestation =
        AttestationRecord::from_request(request, &attester.public_identity(), options.delegation_id);

    // Issue before the ledger write so a refused issuance leaves nothing stored.
    let (witness, pe_attestation) = match pe_inputs {
        Some((engine, capability, pe_session, pe_request, accumulator)) => {
            let (witness, issued) = engine
                .issue_attestation(capability, pe_session, pe_request, &accumulator.accumulator)
                .await?;
            tracing::debug!(
                claim_hash = %attestation.claim_hash,
                accumulator_index = accumulator.index,
                "zero-knowledge attestation issued"
            );
            (Some(witness), Some(issued))
        }
        None => (None, None),
    };

    if let Err(e) = attestation.store(ledger, identity).await {
        if witness.is_some() {
            tracing::warn!(
                claim_hash = %attestation.claim_hash,
                error = %e,
                "ledger refused attestation after zero-knowledge issuance; issued attestation discarded"
            );
        }
        return Err(e.into());
    }

    session.commit(next);
    let reply = Message::new(
        MessageBody::SubmitAttestationForClaim(SubmitAttestation {
            attestation: attestation.clone(),
            pe_attestation,
        }),
        identity.address(),
        &message.sender_address,
    );
    Ok((
        RevocationHandle {
            witness,
            attestation,
        },
        reply,
    ))
}

/// Refuse the request in `message` with `REJECT_ATTESTATION_FOR_CLAIM`.
pub fn reject_attestation(
    attester: &AttesterIdentity,
    session: &mut AttesterAttestationSession,
    message: &Message,
) -> Result<Message, ProtocolError> {
    let MessageBody::RequestAttestationForClaim(content) = &message.body else {
        return Err(ProtocolError::mismatch(
            message.body_type(),
            MessageBodyType::RequestAttestationForClaim,
        ));
    };
    let next = session.after(&[AttestationEvent::Request, AttestationEvent::Reject])?;
    session.commit(next);
    tracing::info!(root_hash = %content.request.root_hash, "attestation rejected");
    Ok(Message::new(
        MessageBody::RejectAttestationForClaim(content.request.root_hash),
        attester.identity().address(),
        &message.sender_address,
    ))
}

/// Revoke the attestation behind `handle`.
///
/// With a witness the accumulator is updated and republished first, then
/// the record is flagged revoked on the ledger.
pub async fn revoke_attestation(
    attester: &AttesterIdentity,
    handle: &RevocationHandle,
    ledger: &dyn Ledger,
    engine: Option<&dyn PrivacyEngine>,
) -> Result<Receipt, ProtocolError> {
    let identity = attester.identity();
    if let Some(witness) = &handle.witness {
        let engine = engine.ok_or(ProtocolError::PrivacyEngineMissing)?;
        let capability = attester.capability()?;
        let current = ledger
            .query_accumulator(identity.address())
            .await?
            .ok_or_else(|| ProtocolError::AccumulatorMissing(identity.address().clone()))?;
        let updated = engine
            .revoke_witness(capability, &current.accumulator, std::slice::from_ref(witness))
            .await?;
        ledger
            .store_accumulator(&updated, current.index + 1, identity)
            .await?;
        tracing::info!(
            attester = %identity.address(),
            index = current.index + 1,
            "witness removed from accumulator"
        );
    }
    Ok(handle.attestation.revoke(ledger, identity).await?)
}
