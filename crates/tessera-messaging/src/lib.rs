//! Tessera Messaging
//!
//! Protocol steps travel between two identities as a `MessageBody` (a
//! tagged union keyed by `MessageBodyType`) wrapped in a `Message`, and on
//! the wire as an `EncryptedMessage`: box-encrypted, hashed and signed.

pub mod body;
pub mod envelope;
pub mod error;
pub mod message;

pub use body::{
    ClaimsRequest, DelegationAcceptance, DelegationProposal, MessageBody, MessageBodyType,
    RequestAttestation, SubmitAttestation,
};
pub use envelope::{open, seal, EncryptedMessage};
pub use error::EnvelopeError;
pub use message::Message;
