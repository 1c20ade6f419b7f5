use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_core::opaque::{InitToken, PeAttestation, PePresentation, PePresentationRequest};
use tessera_core::{CTypeHash, DelegationId, Digest};
use tessera_credentials::{
    AttestationRecord, Credential, CredentialRequest, DelegationNode, PresentationRequirement,
};
use tessera_crypto::Signature;

/// Claimer → attester: please attest this request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAttestation {
    pub request: CredentialRequest,
}

/// Attester → claimer: the stored attestation, plus the zero-knowledge
/// attestation when the exchange is privacy-enhanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttestation {
    pub attestation: AttestationRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe_attestation: Option<PeAttestation>,
}

/// Verifier → claimer: the claims wanted, per CType.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsRequest {
    pub requirements: Vec<PresentationRequirement>,
    /// Whether a zero-knowledge presentation is acceptable.
    pub allow_pe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe_request: Option<PePresentationRequest>,
}

/// Delegator → delegate: proposed node and the delegator's signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationProposal {
    pub delegation: DelegationNode,
    pub parent_signature: Signature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Delegate → delegator: accepted proposal, countersigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationAcceptance {
    pub delegation: DelegationNode,
    pub parent_signature: Signature,
    pub delegate_signature: Signature,
}

/// Payload of a protocol message, tagged by its [`MessageBodyType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum MessageBody {
    #[serde(rename = "INITIATE_ATTESTATION")]
    InitiateAttestation(InitToken),
    #[serde(rename = "REQUEST_ATTESTATION_FOR_CLAIM")]
    RequestAttestationForClaim(RequestAttestation),
    #[serde(rename = "SUBMIT_ATTESTATION_FOR_CLAIM")]
    SubmitAttestationForClaim(SubmitAttestation),
    /// Root hash of the refused request.
    #[serde(rename = "REJECT_ATTESTATION_FOR_CLAIM")]
    RejectAttestationForClaim(Digest),
    #[serde(rename = "REQUEST_CLAIMS_FOR_CTYPES")]
    RequestClaimsForCTypes(ClaimsRequest),
    /// One redacted credential per requested CType.
    #[serde(rename = "SUBMIT_CLAIMS_FOR_CTYPES_PUBLIC")]
    SubmitClaimsForCTypesPublic(Vec<Credential>),
    #[serde(rename = "SUBMIT_CLAIMS_FOR_CTYPES_PE")]
    SubmitClaimsForCTypesPe(PePresentation),
    #[serde(rename = "REJECT_CLAIMS_FOR_CTYPES")]
    RejectClaimsForCTypes(Vec<CTypeHash>),
    #[serde(rename = "REQUEST_ACCEPT_DELEGATION")]
    RequestAcceptDelegation(DelegationProposal),
    #[serde(rename = "SUBMIT_ACCEPT_DELEGATION")]
    SubmitAcceptDelegation(DelegationAcceptance),
    #[serde(rename = "REJECT_ACCEPT_DELEGATION")]
    RejectAcceptDelegation(DelegationNode),
    #[serde(rename = "INFORM_CREATE_DELEGATION")]
    InformCreateDelegation(DelegationId),
}

/// Discriminant of [`MessageBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageBodyType {
    InitiateAttestation,
    RequestAttestationForClaim,
    SubmitAttestationForClaim,
    RejectAttestationForClaim,
    RequestClaimsForCTypes,
    SubmitClaimsForCTypesPublic,
    SubmitClaimsForCTypesPe,
    RejectClaimsForCTypes,
    RequestAcceptDelegation,
    SubmitAcceptDelegation,
    RejectAcceptDelegation,
    InformCreateDelegation,
}

impl MessageBodyType {
    /// Wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitiateAttestation => "INITIATE_ATTESTATION",
            Self::RequestAttestationForClaim => "REQUEST_ATTESTATION_FOR_CLAIM",
            Self::SubmitAttestationForClaim => "SUBMIT_ATTESTATION_FOR_CLAIM",
            Self::RejectAttestationForClaim => "REJECT_ATTESTATION_FOR_CLAIM",
            Self::RequestClaimsForCTypes => "REQUEST_CLAIMS_FOR_CTYPES",
            Self::SubmitClaimsForCTypesPublic => "SUBMIT_CLAIMS_FOR_CTYPES_PUBLIC",
            Self::SubmitClaimsForCTypesPe => "SUBMIT_CLAIMS_FOR_CTYPES_PE",
            Self::RejectClaimsForCTypes => "REJECT_CLAIMS_FOR_CTYPES",
            Self::RequestAcceptDelegation => "REQUEST_ACCEPT_DELEGATION",
            Self::SubmitAcceptDelegation => "SUBMIT_ACCEPT_DELEGATION",
            Self::RejectAcceptDelegation => "REJECT_ACCEPT_DELEGATION",
            Self::InformCreateDelegation => "INFORM_CREATE_DELEGATION",
        }
    }
}

impl fmt::Display for MessageBodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MessageBody {
    /// Tag of this body.
    pub fn body_type(&self) -> MessageBodyType {
        match self {
            Self::InitiateAttestation(_) => MessageBodyType::InitiateAttestation,
            Self::RequestAttestationForClaim(_) => MessageBodyType::RequestAttestationForClaim,
            Self::SubmitAttestationForClaim(_) => MessageBodyType::SubmitAttestationForClaim,
            Self::RejectAttestationForClaim(_) => MessageBodyType::RejectAttestationForClaim,
            Self::RequestClaimsForCTypes(_) => MessageBodyType::RequestClaimsForCTypes,
            Self::SubmitClaimsForCTypesPublic(_) => MessageBodyType::SubmitClaimsForCTypesPublic,
            Self::SubmitClaimsForCTypesPe(_) => MessageBodyType::SubmitClaimsForCTypesPe,
            Self::RejectClaimsForCTypes(_) => MessageBodyType::RejectClaimsForCTypes,
            Self::RequestAcceptDelegation(_) => MessageBodyType::RequestAcceptDelegation,
            Self::SubmitAcceptDelegation(_) => MessageBodyType::SubmitAcceptDelegation,
            Self::RejectAcceptDelegation(_) => MessageBodyType::RejectAcceptDelegation,
            Self::InformCreateDelegation(_) => MessageBodyType::InformCreateDelegation,
        }
    }
}
