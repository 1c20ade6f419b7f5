//! Delegation acceptance exchange.
//!
//! The delegator proposes a node it has signed, the delegate countersigns
//! it, and the delegator writes it to the ledger and reports the id.

use serde_json::Value;
use tessera_core::DelegationId;
use tessera_credentials::{DelegationNode, Ledger};
use tessera_identity::{Identity, PublicIdentity};
use tessera_messaging::{
    DelegationAcceptance, DelegationProposal, Message, MessageBody, MessageBodyType,
};

use crate::error::ProtocolError;

/// Sign `node` as its parent authority and ask `delegate` to accept it.
pub fn propose_delegation(
    delegator: &Identity,
    delegate: &PublicIdentity,
    node: DelegationNode,
    metadata: Option<Value>,
) -> Result<Message, ProtocolError> {
    if node.account != delegate.address {
        return Err(ProtocolError::DelegateMismatch {
            expected: delegate.address.clone(),
            got: node.account,
        });
    }
    let parent_signature = node.authorize(delegator);
    tracing::debug!(node_id = %node.id, delegate = %delegate.address, "delegation proposed");
    Ok(Message::new(
        MessageBody::RequestAcceptDelegation(DelegationProposal {
            delegation: node,
            parent_signature,
            metadata,
        }),
        delegator.address(),
        &delegate.address,
    ))
}

fn proposal(message: &Message) -> Result<&DelegationProposal, ProtocolError> {
    match &message.body {
        MessageBody::RequestAcceptDelegation(proposal) => Ok(proposal),
        other => Err(ProtocolError::mismatch(
            other.body_type(),
            MessageBodyType::RequestAcceptDelegation,
        )),
    }
}

/// Accept a proposal addressed to `delegate`, after checking the
/// delegator's signature, with `SUBMIT_ACCEPT_DELEGATION`.
pub fn accept_delegation(delegate: &Identity, message: &Message) -> Result<Message, ProtocolError> {
    let proposal = proposal(message)?;
    let node = &proposal.delegation;
    if &node.account != delegate.address() {
        return Err(ProtocolError::DelegateMismatch {
            expected: delegate.address().clone(),
            got: node.account.clone(),
        });
    }
    if !node.verify_signature(&proposal.parent_signature, &message.sender_address) {
        tracing::warn!(
            node_id = %node.id,
            delegator = %message.sender_address,
            "delegator signature invalid"
        );
        return Err(ProtocolError::InvalidDelegationSignature(
            message.sender_address.clone(),
        ));
    }
    let delegate_signature = node.sign(delegate);
    tracing::info!(node_id = %node.id, delegator = %message.sender_address, "delegation accepted");
    Ok(Message::new(
        MessageBody::SubmitAcceptDelegation(DelegationAcceptance {
            delegation: node.clone(),
            parent_signature: proposal.parent_signature.clone(),
            delegate_signature,
        }),
        delegate.address(),
        &message.sender_address,
    ))
}

/// Decline a proposal with `REJECT_ACCEPT_DELEGATION`.
pub fn reject_delegation(delegate: &Identity, message: &Message) -> Result<Message, ProtocolError> {
    let proposal = proposal(message)?;
    tracing::info!(node_id = %proposal.delegation.id, "delegation declined");
    Ok(Message::new(
        MessageBody::RejectAcceptDelegation(proposal.delegation.clone()),
        delegate.address(),
        &message.sender_address,
    ))
}

/// Store an accepted delegation and tell the delegate with
/// `INFORM_CREATE_DELEGATION`.
pub async fn finalize_delegation(
    delegator: &Identity,
    message: &Message,
    ledger: &dyn Ledger,
) -> Result<(DelegationNode, Message), ProtocolError> {
    let MessageBody::SubmitAcceptDelegation(acceptance) = &message.body else {
        return Err(ProtocolError::mismatch(
            message.body_type(),
            MessageBodyType::SubmitAcceptDelegation,
        ));
    };
    let node = &acceptance.delegation;
    if node.account != message.sender_address {
        return Err(ProtocolError::DelegateMismatch {
            expected: node.account.clone(),
            got: message.sender_address.clone(),
        });
    }
    if !node.verify_signature(&acceptance.delegate_signature, &node.account) {
        return Err(ProtocolError::InvalidDelegationSignature(node.account.clone()));
    }

    node.store(ledger, delegator, &acceptance.parent_signature).await?;
    let inform = Message::new(
        MessageBody::InformCreateDelegation(node.id),
        delegator.address(),
        &node.account,
    );
    Ok((node.clone(), inform))
}

/// Delegation id announced by an `INFORM_CREATE_DELEGATION`.
pub fn created_delegation(message: &Message) -> Result<DelegationId, ProtocolError> {
    match &message.body {
        MessageBody::InformCreateDelegation(id) => Ok(*id),
        other => Err(ProtocolError::mismatch(
            other.body_type(),
            MessageBodyType::InformCreateDelegation,
        )),
    }
}
