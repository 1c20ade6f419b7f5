use std::fmt;

use crate::error::CoreError;

/// States of one credential issuance, as seen by either party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AttestationState {
    /// Nothing exchanged yet.
    Idle,
    /// The attester opened a PE session and sent an init token.
    Initiated,
    /// The claimer sent its credential request.
    Requested,
    /// The attester stored the attestation and answered.
    Submitted,
    /// The claimer assembled its credential. Final state.
    CredentialBuilt,
    /// The attester refused the request. Final state.
    Rejected,
}

impl AttestationState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::CredentialBuilt | Self::Rejected)
    }
}

impl fmt::Display for AttestationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Initiated => write!(f, "Initiated"),
            Self::Requested => write!(f, "Requested"),
            Self::Submitted => write!(f, "Submitted"),
            Self::CredentialBuilt => write!(f, "CredentialBuilt"),
            Self::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Events that move an issuance forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestationEvent {
    /// Attester starts a PE session.
    Initiate,
    /// Claimer sends a credential request.
    Request,
    /// Attester submits the attestation.
    Submit,
    /// Claimer builds the credential.
    BuildCredential,
    /// Attester rejects the request.
    Reject,
}

/// States of one presentation exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PresentationState {
    /// Nothing exchanged yet.
    Idle,
    /// The verifier asked for claims.
    Requested,
    /// The claimer answered with presentations.
    Submitted,
    /// The verifier checked the presentations. Final state.
    Verified,
    /// The claimer refused to present. Final state.
    Rejected,
}

impl PresentationState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Verified | Self::Rejected)
    }
}

impl fmt::Display for PresentationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Requested => write!(f, "Requested"),
            Self::Submitted => write!(f, "Submitted"),
            Self::Verified => write!(f, "Verified"),
            Self::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Events that move a presentation exchange forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationEvent {
    /// Verifier requests claims.
    Request,
    /// Claimer submits presentations.
    Submit,
    /// Verifier finishes verification.
    Verify,
    /// Claimer rejects the request.
    Reject,
}

/// Transition tables for the attestation and presentation exchanges.
///
/// Attestation:
/// - Idle → Initiated (Initiate, PE path only)
/// - Idle → Requested (Request, plain path)
/// - Initiated → Requested (Request)
/// - Requested → Submitted (Submit)
/// - Requested → Rejected (Reject)
/// - Submitted → CredentialBuilt (BuildCredential)
///
/// Presentation:
/// - Idle → Requested (Request)
/// - Requested → Submitted (Submit)
/// - Requested → Rejected (Reject)
/// - Submitted → Verified (Verify)
pub struct ProtocolStateMachine;

impl ProtocolStateMachine {
    /// Advance an attestation exchange.
    pub fn attestation(
        current: AttestationState,
        event: AttestationEvent,
    ) -> Result<AttestationState, CoreError> {
        use AttestationEvent as E;
        use AttestationState as S;

        let next = match (current, event) {
            (S::Idle, E::Initiate) => S::Initiated,
            (S::Idle, E::Request) => S::Requested,
            (S::Initiated, E::Request) => S::Requested,
            (S::Requested, E::Submit) => S::Submitted,
            (S::Requested, E::Reject) => S::Rejected,
            (S::Submitted, E::BuildCredential) => S::CredentialBuilt,
            _ => {
                return Err(CoreError::InvalidAttestationTransition {
                    from: current,
                    event,
                })
            }
        };

        tracing::debug!(from = %current, to = %next, event = ?event, "attestation state transition");
        Ok(next)
    }

    /// Advance a presentation exchange.
    pub fn presentation(
        current: PresentationState,
        event: PresentationEvent,
    ) -> Result<PresentationState, CoreError> {
        use PresentationEvent as E;
        use PresentationState as S;

        let next = match (current, event) {
            (S::Idle, E::Request) => S::Requested,
            (S::Requested, E::Submit) => S::Submitted,
            (S::Requested, E::Reject) => S::Rejected,
            (S::Submitted, E::Verify) => S::Verified,
            _ => {
                return Err(CoreError::InvalidPresentationTransition {
                    from: current,
                    event,
                })
            }
        };

        tracing::debug!(from = %current, to = %next, event = ?event, "presentation state transition");
        Ok(next)
    }

    /// Check an attestation transition without performing it.
    pub fn can_attest(current: AttestationState, event: AttestationEvent) -> bool {
        Self::attestation(current, event).is_ok()
    }
}
