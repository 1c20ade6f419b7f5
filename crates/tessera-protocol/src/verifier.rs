use serde_json::Value;
use std::collections::BTreeSet;
use tessera_core::opaque::{Accumulator, AttesterPublicKey};
use tessera_core::{Address, CTypeHash, PresentationEvent};
use tessera_credentials::{Credential, Ledger, PresentationRequirement, PrivacyEngine};
use tessera_identity::{Identity, PublicIdentity};
use tessera_messaging::{ClaimsRequest, Message, MessageBody, MessageBodyType};

use crate::error::ProtocolError;
use crate::session::VerifierSession;

/// Builds a `REQUEST_CLAIMS_FOR_CTYPES` message and the matching session.
#[derive(Debug, Clone, Default)]
pub struct PresentationRequestBuilder {
    requirements: Vec<PresentationRequirement>,
    allow_pe: bool,
}

impl PresentationRequestBuilder {
    /// Builder with no requirements and PE disallowed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a credential of `ctype_hash` disclosing exactly `properties`.
    pub fn request_properties<I, S>(mut self, ctype_hash: CTypeHash, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements.push(PresentationRequirement {
            ctype_hash,
            properties: properties.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Accept a zero-knowledge presentation instead of redacted credentials.
    pub fn allow_pe(mut self, allow: bool) -> Self {
        self.allow_pe = allow;
        self
    }

    /// Produce the request for `claimer`. Allowing PE needs `engine` to
    /// open the verifier's session.
    pub async fn finalize(
        self,
        verifier: &Identity,
        claimer: &PublicIdentity,
        engine: Option<&dyn PrivacyEngine>,
    ) -> Result<(Message, VerifierSession), ProtocolError> {
        let (pe_session, pe_request) = if self.allow_pe {
            let engine = engine.ok_or(ProtocolError::PrivacyEngineMissing)?;
            let (session, request) = engine.request_presentation(&self.requirements).await?;
            (Some(session), Some(request))
        } else {
            (None, None)
        };

        let session = VerifierSession::requested(
            claimer.address.clone(),
            self.requirements.clone(),
            self.allow_pe,
            pe_session,
        )?;
        tracing::debug!(
            claimer = %claimer.address,
            ctypes = self.requirements.len(),
            allow_pe = self.allow_pe,
            "claims requested"
        );
        let message = Message::new(
            MessageBody::RequestClaimsForCTypes(ClaimsRequest {
                requirements: self.requirements,
                allow_pe: self.allow_pe,
                pe_request,
            }),
            verifier.address(),
            &claimer.address,
        );
        Ok((message, session))
    }
}

/// Inputs for checking a zero-knowledge presentation.
#[derive(Clone, Copy)]
pub struct VerifierPrivacy<'a> {
    pub engine: &'a dyn PrivacyEngine,
    pub accumulators: &'a [Accumulator],
    pub attester_keys: &'a [AttesterPublicKey],
}

/// Result of checking a presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationOutcome {
    pub verified: bool,
    /// Disclosed properties per requested CType, in request order.
    pub claims: Vec<Value>,
}

/// Latest accumulator of each attester, in the order given.
pub async fn latest_accumulators(
    ledger: &dyn Ledger,
    attesters: &[Address],
) -> Result<Vec<Accumulator>, ProtocolError> {
    let mut accumulators = Vec::with_capacity(attesters.len());
    for attester in attesters {
        let latest = ledger
            .query_accumulator(attester)
            .await?
            .ok_or_else(|| ProtocolError::AccumulatorMissing(attester.clone()))?;
        accumulators.push(latest.accumulator);
    }
    Ok(accumulators)
}

/// Check the claimer's answer to the request behind `session`.
///
/// Public presentations must match the request one to one: same count,
/// same CTypes in order, exactly the requested properties disclosed, and
/// each credential valid on the ledger. Zero-knowledge proofs go to the
/// engine with the supplied accumulators and attester keys.
pub async fn verify_presentation(
    session: &mut VerifierSession,
    message: &Message,
    ledger: &dyn Ledger,
    privacy: Option<VerifierPrivacy<'_>>,
) -> Result<PresentationOutcome, ProtocolError> {
    if message.sender_address != session.claimer {
        return Err(ProtocolError::UnexpectedSender {
            expected: session.claimer.clone(),
            got: message.sender_address.clone(),
        });
    }

    match &message.body {
        MessageBody::SubmitClaimsForCTypesPublic(presentations) => {
            message.ensure_owner_is_sender()?;
            let next = session.after(&[PresentationEvent::Submit, PresentationEvent::Verify])?;
            let outcome = verify_public(&session.requirements, presentations, ledger).await?;
            session.commit(next);
            Ok(outcome)
        }
        MessageBody::SubmitClaimsForCTypesPe(proof) => {
            if !session.allow_pe {
                return Err(ProtocolError::PeMismatch(
                    "zero-knowledge presentation was not allowed".into(),
                ));
            }
            let pe_session = session
                .pe_session
                .as_ref()
                .ok_or(ProtocolError::PresentationSessionMissing)?;
            let privacy = privacy.ok_or(ProtocolError::PrivacyEngineMissing)?;
            if privacy.accumulators.is_empty() || privacy.attester_keys.is_empty() {
                return Err(ProtocolError::PeVerificationInputsMissing);
            }
            let next = session.after(&[PresentationEvent::Submit, PresentationEvent::Verify])?;
            let (verified, claims) = privacy
                .engine
                .verify_combined_presentation(
                    proof,
                    pe_session,
                    privacy.accumulators,
                    privacy.attester_keys,
                )
                .await?;
            session.commit(next);
            tracing::info!(
                claimer = %message.sender_address,
                verified,
                "zero-knowledge presentation checked"
            );
            Ok(PresentationOutcome { verified, claims })
        }
        MessageBody::RejectClaimsForCTypes(ctypes) => {
            let next = session.after(&[PresentationEvent::Reject])?;
            session.commit(next);
            tracing::info!(claimer = %message.sender_address, "claimer refused to present");
            Err(ProtocolError::PresentationRejected(ctypes.clone()))
        }
        other => Err(ProtocolError::mismatch(
            other.body_type(),
            MessageBodyType::SubmitClaimsForCTypesPublic,
        )),
    }
}

async fn verify_public(
    requirements: &[PresentationRequirement],
    presentations: &[Credential],
    ledger: &dyn Ledger,
) -> Result<PresentationOutcome, ProtocolError> {
    if presentations.len() != requirements.len() {
        tracing::warn!(
            expected = requirements.len(),
            got = presentations.len(),
            "presentation count mismatch"
        );
        return Ok(PresentationOutcome {
            verified: false,
            claims: Vec::new(),
        });
    }

    let mut verified = true;
    let mut claims = Vec::with_capacity(presentations.len());
    for (requirement, presentation) in requirements.iter().zip(presentations) {
        let disclosed: BTreeSet<&str> =
            presentation.attributes().keys().map(String::as_str).collect();
        let requested: BTreeSet<&str> =
            requirement.properties.iter().map(String::as_str).collect();

        let ok = presentation.ctype_hash() == &requirement.ctype_hash
            && disclosed == requested
            && presentation.verify(ledger).await?;
        if !ok {
            tracing::warn!(
                claim_hash = %presentation.hash(),
                ctype_hash = %requirement.ctype_hash,
                "presentation does not satisfy requirement"
            );
        }
        verified &= ok;
        claims.push(presentation.request.claim.contents_value());
    }

    tracing::info!(ctypes = requirements.len(), verified, "public presentation checked");
    Ok(PresentationOutcome { verified, claims })
}
