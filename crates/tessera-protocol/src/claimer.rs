use tessera_core::opaque::{AttesterPublicKey, ZkCredential};
use tessera_core::{
    AttestationEvent, AttestationState, DelegationId, PresentationConfig, ProtocolStateMachine,
};
use tessera_credentials::{Claim, Credential, CredentialRequest, PrivacyEngine};
use tessera_identity::{Identity, PublicIdentity};
use tessera_messaging::{Message, MessageBody, MessageBodyType, RequestAttestation};

use crate::error::ProtocolError;
use crate::session::ClaimerAttestationSession;

/// The engine and the attester's PE key, for zero-knowledge requests.
#[derive(Clone, Copy)]
pub struct PrivacyContext<'a> {
    pub engine: &'a dyn PrivacyEngine,
    pub attester_key: &'a AttesterPublicKey,
}

/// Extra inputs to [`request_attestation`].
#[derive(Default)]
pub struct RequestOptions<'a> {
    pub legitimations: Vec<Credential>,
    pub delegation_id: Option<DelegationId>,
    /// The attester's `INITIATE_ATTESTATION`, on the PE path.
    pub initiation: Option<&'a Message>,
    pub privacy: Option<PrivacyContext<'a>>,
}

/// Build a credential request for `claim` and the
/// `REQUEST_ATTESTATION_FOR_CLAIM` message carrying it.
///
/// With an initiation message the request is also blinded for the
/// attester's PE session, which needs `options.privacy`.
pub async fn request_attestation(
    claim: Claim,
    claimer: &Identity,
    attester: &PublicIdentity,
    options: RequestOptions<'_>,
) -> Result<(Message, ClaimerAttestationSession), ProtocolError> {
    let RequestOptions {
        legitimations,
        delegation_id,
        initiation,
        privacy,
    } = options;

    let (request, pe_session, state) = match initiation {
        Some(init) => {
            let MessageBody::InitiateAttestation(init_token) = &init.body else {
                return Err(ProtocolError::mismatch(
                    init.body_type(),
                    MessageBodyType::InitiateAttestation,
                ));
            };
            if init.sender_address != attester.address {
                return Err(ProtocolError::UnexpectedSender {
                    expected: attester.address.clone(),
                    got: init.sender_address.clone(),
                });
            }
            let privacy = privacy.ok_or(ProtocolError::PrivacyEngineMissing)?;
            let state = [AttestationEvent::Initiate, AttestationEvent::Request]
                .into_iter()
                .try_fold(AttestationState::Idle, ProtocolStateMachine::attestation)?;
            let (request, pe_session) = CredentialRequest::build_with_privacy(
                claim,
                claimer,
                legitimations,
                delegation_id,
                privacy.engine,
                init_token,
                privacy.attester_key,
            )
            .await?;
            (request, Some(pe_session), state)
        }
        None => {
            let state = ProtocolStateMachine::attestation(
                AttestationState::Idle,
                AttestationEvent::Request,
            )?;
            let request = CredentialRequest::build(claim, claimer, legitimations, delegation_id)?;
            (request, None, state)
        }
    };

    tracing::info!(
        root_hash = %request.root_hash,
        attester = %attester.address,
        privacy_enhanced = pe_session.is_some(),
        "attestation requested"
    );
    let message = Message::new(
        MessageBody::RequestAttestationForClaim(RequestAttestation {
            request: request.clone(),
        }),
        claimer.address(),
        &attester.address,
    );
    let session =
        ClaimerAttestationSession::new(state, attester.address.clone(), request, pe_session);
    Ok((message, session))
}

/// Turn the attester's `SUBMIT_ATTESTATION_FOR_CLAIM` into a credential.
///
/// On the PE path the zero-knowledge credential is built too, when the
/// attester sent a zero-knowledge attestation.
pub async fn build_credential(
    session: &mut ClaimerAttestationSession,
    message: &Message,
    engine: Option<&dyn PrivacyEngine>,
) -> Result<Credential, ProtocolError> {
    let MessageBody::SubmitAttestationForClaim(content) = &message.body else {
        return Err(ProtocolError::mismatch(
            message.body_type(),
            MessageBodyType::SubmitAttestationForClaim,
        ));
    };
    if message.sender_address != session.attester {
        return Err(ProtocolError::UnexpectedSender {
            expected: session.attester.clone(),
            got: message.sender_address.clone(),
        });
    }
    message.ensure_owner_is_sender()?;
    if content.attestation.claim_hash != session.request.root_hash {
        return Err(ProtocolError::AttestationMismatch {
            expected: session.request.root_hash,
            got: content.attestation.claim_hash,
        });
    }
    let next = session.after(&[AttestationEvent::Submit, AttestationEvent::BuildCredential])?;

    let request = session.request.clone();
    let attestation = content.attestation.clone();
    let credential = match (&session.pe_session, &content.pe_attestation) {
        (Some(pe_session), Some(pe_attestation)) => {
            let engine = engine.ok_or(ProtocolError::PrivacyEngineMissing)?;
            Credential::from_request_and_attestation_pe(
                request,
                attestation,
                engine,
                pe_session,
                pe_attestation,
            )
            .await?
        }
        (Some(_), None) => {
            tracing::warn!(
                claim_hash = %attestation.claim_hash,
                "attester answered without a zero-knowledge attestation"
            );
            Credential::from_request_and_attestation(request, attestation)
        }
        _ => Credential::from_request_and_attestation(request, attestation),
    };

    session.commit(next);
    tracing::info!(
        claim_hash = %credential.hash(),
        attester = %credential.attester(),
        privacy_enhanced = credential.is_privacy_enhanced(),
        "credential built"
    );
    Ok(credential)
}

/// Engine and attester keys for zero-knowledge presentations.
#[derive(Clone, Copy)]
pub struct PresentationPrivacy<'a> {
    pub engine: &'a dyn PrivacyEngine,
    /// One key per requested CType, in request order.
    pub attester_keys: &'a [AttesterPublicKey],
}

/// Answer a `REQUEST_CLAIMS_FOR_CTYPES` from `credentials`.
///
/// One credential is picked per requested CType, in request order. The
/// zero-knowledge path is used when `config.require_pe` is set, or when the
/// verifier allows it, `privacy` is supplied and every picked credential
/// has a zero-knowledge part. Otherwise each credential is redacted down
/// to the requested properties.
pub async fn create_presentation(
    request_message: &Message,
    credentials: &[Credential],
    claimer: &Identity,
    config: &PresentationConfig,
    privacy: Option<PresentationPrivacy<'_>>,
) -> Result<Message, ProtocolError> {
    let MessageBody::RequestClaimsForCTypes(request) = &request_message.body else {
        return Err(ProtocolError::mismatch(
            request_message.body_type(),
            MessageBodyType::RequestClaimsForCTypes,
        ));
    };
    if config.require_pe && !request.allow_pe {
        return Err(ProtocolError::PeMismatch(
            "verifier does not accept zero-knowledge presentations".into(),
        ));
    }

    let selected = request
        .requirements
        .iter()
        .map(|requirement| {
            credentials
                .iter()
                .find(|credential| credential.ctype_hash() == &requirement.ctype_hash)
                .map(|credential| (requirement, credential))
                .ok_or(ProtocolError::CredentialMissing(requirement.ctype_hash))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let use_pe = config.require_pe
        || (request.allow_pe
            && request.pe_request.is_some()
            && privacy.is_some()
            && selected.iter().all(|(_, c)| c.is_privacy_enhanced()));

    let body = if use_pe {
        let privacy = privacy.ok_or(ProtocolError::PrivacyEngineMissing)?;
        let pe_request = request.pe_request.as_ref().ok_or_else(|| {
            ProtocolError::PeMismatch("request carries no zero-knowledge challenge".into())
        })?;
        let zk_credentials = selected
            .iter()
            .map(|(requirement, credential)| {
                credential
                    .privacy_credential
                    .clone()
                    .ok_or(ProtocolError::PeCredentialMissing(requirement.ctype_hash))
            })
            .collect::<Result<Vec<ZkCredential>, _>>()?;
        let proof = privacy
            .engine
            .build_combined_presentation(&zk_credentials, pe_request, privacy.attester_keys)
            .await?;
        MessageBody::SubmitClaimsForCTypesPe(proof)
    } else {
        let presentations = selected
            .iter()
            .map(|(requirement, credential)| {
                credential.create_presentation_credential(
                    requirement.properties.as_slice(),
                    config.reveal_owner,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        MessageBody::SubmitClaimsForCTypesPublic(presentations)
    };

    tracing::info!(
        verifier = %request_message.sender_address,
        ctypes = selected.len(),
        privacy_enhanced = use_pe,
        "presentation created"
    );
    Ok(Message::new(
        body,
        claimer.address(),
        &request_message.sender_address,
    ))
}

/// Refuse a `REQUEST_CLAIMS_FOR_CTYPES` with `REJECT_CLAIMS_FOR_CTYPES`.
pub fn reject_presentation(
    request_message: &Message,
    claimer: &Identity,
) -> Result<Message, ProtocolError> {
    let MessageBody::RequestClaimsForCTypes(request) = &request_message.body else {
        return Err(ProtocolError::mismatch(
            request_message.body_type(),
            MessageBodyType::RequestClaimsForCTypes,
        ));
    };
    let ctypes = request.requirements.iter().map(|r| r.ctype_hash).collect();
    tracing::info!(verifier = %request_message.sender_address, "presentation refused");
    Ok(Message::new(
        MessageBody::RejectClaimsForCTypes(ctypes),
        claimer.address(),
        &request_message.sender_address,
    ))
}
