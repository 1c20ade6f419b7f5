//! Per-exchange state kept locally by each role.
//!
//! Sessions are plain values. Dropping one abandons the exchange.

use tessera_core::opaque::{AttesterPeSession, ClaimerPeSession, PeVerifierSession, Witness};
use tessera_core::{
    Address, AttestationEvent, AttestationState, CoreError, PresentationEvent, PresentationState,
    ProtocolStateMachine,
};
use tessera_credentials::{AttestationRecord, CredentialRequest, PresentationRequirement};

/// Attester side of one issuance.
#[derive(Debug, Clone)]
pub struct AttesterAttestationSession {
    state: AttestationState,
    pe_session: Option<AttesterPeSession>,
}

impl AttesterAttestationSession {
    /// Session for a plain request that arrives without initiation.
    pub fn new() -> Self {
        Self {
            state: AttestationState::Idle,
            pe_session: None,
        }
    }

    pub(crate) fn initiated(pe_session: AttesterPeSession) -> Result<Self, CoreError> {
        Ok(Self {
            state: ProtocolStateMachine::attestation(
                AttestationState::Idle,
                AttestationEvent::Initiate,
            )?,
            pe_session: Some(pe_session),
        })
    }

    /// Current issuance state.
    pub fn state(&self) -> AttestationState {
        self.state
    }

    /// PE session opened by `initiate_attestation`.
    pub fn pe_session(&self) -> Option<&AttesterPeSession> {
        self.pe_session.as_ref()
    }

    /// State after `events`, without committing it.
    pub(crate) fn after(&self, events: &[AttestationEvent]) -> Result<AttestationState, CoreError> {
        events.iter().try_fold(self.state, |state, event| {
            ProtocolStateMachine::attestation(state, *event)
        })
    }

    pub(crate) fn commit(&mut self, state: AttestationState) {
        self.state = state;
    }
}

impl Default for AttesterAttestationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Claimer side of one issuance: the request sent and, on the PE path,
/// the engine session needed to unblind the attestation.
#[derive(Debug, Clone)]
pub struct ClaimerAttestationSession {
    state: AttestationState,
    pub(crate) attester: Address,
    pub(crate) request: CredentialRequest,
    pub(crate) pe_session: Option<ClaimerPeSession>,
}

impl ClaimerAttestationSession {
    pub(crate) fn new(
        state: AttestationState,
        attester: Address,
        request: CredentialRequest,
        pe_session: Option<ClaimerPeSession>,
    ) -> Self {
        Self {
            state,
            attester,
            request,
            pe_session,
        }
    }

    /// Current issuance state.
    pub fn state(&self) -> AttestationState {
        self.state
    }

    /// The request sent to the attester.
    pub fn request(&self) -> &CredentialRequest {
        &self.request
    }

    /// Attester the request was sent to.
    pub fn attester(&self) -> &Address {
        &self.attester
    }

    /// Whether the request carries a PE part.
    pub fn is_privacy_enhanced(&self) -> bool {
        self.pe_session.is_some()
    }

    pub(crate) fn after(&self, events: &[AttestationEvent]) -> Result<AttestationState, CoreError> {
        events.iter().try_fold(self.state, |state, event| {
            ProtocolStateMachine::attestation(state, *event)
        })
    }

    pub(crate) fn commit(&mut self, state: AttestationState) {
        self.state = state;
    }
}

/// Verifier side of one presentation exchange.
#[derive(Debug, Clone)]
pub struct VerifierSession {
    state: PresentationState,
    pub(crate) claimer: Address,
    pub(crate) requirements: Vec<PresentationRequirement>,
    pub(crate) allow_pe: bool,
    pub(crate) pe_session: Option<PeVerifierSession>,
}

impl VerifierSession {
    pub(crate) fn requested(
        claimer: Address,
        requirements: Vec<PresentationRequirement>,
        allow_pe: bool,
        pe_session: Option<PeVerifierSession>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            state: ProtocolStateMachine::presentation(
                PresentationState::Idle,
                PresentationEvent::Request,
            )?,
            claimer,
            requirements,
            allow_pe,
            pe_session,
        })
    }

    /// Current presentation state.
    pub fn state(&self) -> PresentationState {
        self.state
    }

    /// What was asked for, per CType.
    pub fn requirements(&self) -> &[PresentationRequirement] {
        &self.requirements
    }

    /// Whether a zero-knowledge answer is accepted.
    pub fn allows_pe(&self) -> bool {
        self.allow_pe
    }

    pub(crate) fn after(
        &self,
        events: &[PresentationEvent],
    ) -> Result<PresentationState, CoreError> {
        events.iter().try_fold(self.state, |state, event| {
            ProtocolStateMachine::presentation(state, *event)
        })
    }

    pub(crate) fn commit(&mut self, state: PresentationState) {
        self.state = state;
    }
}

/// What an attester keeps to revoke a credential later.
#[derive(Debug, Clone, PartialEq)]
pub struct RevocationHandle {
    /// Present when a zero-knowledge attestation was issued.
    pub witness: Option<Witness>,
    pub attestation: AttestationRecord,
}
