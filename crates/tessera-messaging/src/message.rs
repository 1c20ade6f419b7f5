use serde::{Deserialize, Serialize};
use tessera_core::{now_millis, Address};

use crate::body::{MessageBody, MessageBodyType};
use crate::error::EnvelopeError;

/// A decrypted protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub body: MessageBody,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub sender_address: Address,
    pub receiver_address: Address,
}

impl Message {
    /// Plaintext message stamped with the current time.
    pub fn new(body: MessageBody, sender: &Address, receiver: &Address) -> Self {
        Self {
            body,
            created_at: now_millis(),
            sender_address: sender.clone(),
            receiver_address: receiver.clone(),
        }
    }

    /// Tag of the body.
    pub fn body_type(&self) -> MessageBodyType {
        self.body.body_type()
    }

    /// Reject bodies whose claim owner or attester is not the sender.
    ///
    /// Requests and presentations are checked against the claimer that
    /// signed them, attestations against the attester.
    pub fn ensure_owner_is_sender(&self) -> Result<(), EnvelopeError> {
        match &self.body {
            MessageBody::RequestAttestationForClaim(content) => {
                let request = &content.request;
                let owner = request.claim.owner.as_ref().unwrap_or(request.signer());
                self.check_sender(owner)
            }
            MessageBody::SubmitAttestationForClaim(content) => {
                self.check_sender(&content.attestation.owner)
            }
            MessageBody::SubmitClaimsForCTypesPublic(credentials) => credentials
                .iter()
                .try_for_each(|credential| self.check_sender(credential.request.signer())),
            _ => Ok(()),
        }
    }

    fn check_sender(&self, owner: &Address) -> Result<(), EnvelopeError> {
        if owner != &self.sender_address {
            return Err(EnvelopeError::OwnerNotSender {
                owner: owner.clone(),
                sender: self.sender_address.clone(),
            });
        }
        Ok(())
    }
}
