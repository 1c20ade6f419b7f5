use tessera_core::opaque::{AttesterPrivateKey, AttesterPublicKey};

use crate::error::IdentityError;
use crate::identity::{Identity, PublicIdentity};

/// PE key pair that lets an attester issue zero-knowledge attestations.
#[derive(Debug, Clone)]
pub struct AttestationCapability {
    pub public_key: AttesterPublicKey,
    pub private_key: AttesterPrivateKey,
}

/// An identity that attests claims.
///
/// Plain attestations only need the identity. Zero-knowledge issuance and
/// accumulator revocation also need the [`AttestationCapability`].
#[derive(Debug)]
pub struct AttesterIdentity {
    identity: Identity,
    capability: Option<AttestationCapability>,
}

impl AttesterIdentity {
    /// An attester limited to plain attestations.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            capability: None,
        }
    }

    /// Attester holding PE keys.
    pub fn with_capability(identity: Identity, capability: AttestationCapability) -> Self {
        Self {
            identity,
            capability: Some(capability),
        }
    }

    /// The underlying signing identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Public half to hand to claimers.
    pub fn public_identity(&self) -> PublicIdentity {
        self.identity.public_identity()
    }

    /// Whether zero-knowledge attestations can be issued.
    pub fn has_capability(&self) -> bool {
        self.capability.is_some()
    }

    /// The PE capability, or an error naming this attester.
    pub fn capability(&self) -> Result<&AttestationCapability, IdentityError> {
        self.capability
            .as_ref()
            .ok_or_else(|| IdentityError::NoAttestationCapability(self.identity.address().clone()))
    }

    /// Drop the capability and keep the identity.
    pub fn into_identity(self) -> Identity {
        self.identity
    }
}

impl AsRef<Identity> for AttesterIdentity {
    fn as_ref(&self) -> &Identity {
        &self.identity
    }
}
