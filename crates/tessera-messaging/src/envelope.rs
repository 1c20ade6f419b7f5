use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tessera_core::{now_millis, Address, Digest};
use tessera_crypto::{decrypt, encrypt, hash, verify_digest, EncryptedPayload, Signature};
use tessera_identity::{Identity, PublicIdentity};

use crate::body::MessageBody;
use crate::error::EnvelopeError;
use crate::message::Message;

/// A message as it travels between parties.
///
/// `hash = H(ciphertext || nonce || created_at)` with `created_at` as a
/// decimal string, and `signature` is the sender's signature over `hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedMessage {
    pub sender_address: Address,
    pub receiver_address: Address,
    pub created_at: i64,
    /// Base64 ciphertext of the JSON body.
    pub message: String,
    /// Hex XChaCha20 nonce.
    pub nonce: String,
    pub hash: Digest,
    pub signature: Signature,
}

fn envelope_hash(ciphertext: &[u8], nonce: &[u8], created_at: i64) -> Digest {
    let created_at = created_at.to_string();
    let mut input = Vec::with_capacity(ciphertext.len() + nonce.len() + created_at.len());
    input.extend_from_slice(ciphertext);
    input.extend_from_slice(nonce);
    input.extend_from_slice(created_at.as_bytes());
    hash(&input)
}

/// Encrypt `body` for `receiver` and sign it as `sender`.
pub fn seal(
    body: &MessageBody,
    sender: &Identity,
    receiver: &PublicIdentity,
) -> Result<EncryptedMessage, EnvelopeError> {
    let plaintext =
        serde_json::to_vec(body).map_err(|e| EnvelopeError::Serialization(e.to_string()))?;
    let receiver_box_key = receiver.box_key_bytes()?;
    let payload = encrypt(&plaintext, sender.keypair(), &receiver_box_key)
        .map_err(|e| EnvelopeError::EncryptionFailed(e.to_string()))?;

    let created_at = now_millis();
    let digest = envelope_hash(&payload.ciphertext, &payload.nonce, created_at);
    let signature = sender.sign_digest(&digest);

    tracing::debug!(
        message_type = %body.body_type(),
        sender = %sender.address(),
        receiver = %receiver.address,
        "message sealed"
    );

    Ok(EncryptedMessage {
        sender_address: sender.address().clone(),
        receiver_address: receiver.address.clone(),
        created_at,
        message: BASE64.encode(&payload.ciphertext),
        nonce: hex::encode(payload.nonce),
        hash: digest,
        signature,
    })
}

/// Check and decrypt an envelope from `sender` addressed to `receiver`.
///
/// After the addresses are matched the checks run in a fixed order:
/// decrypt, hash, signature, body parse.
pub fn open(
    envelope: &EncryptedMessage,
    sender: &PublicIdentity,
    receiver: &Identity,
) -> Result<Message, EnvelopeError> {
    if envelope.sender_address != sender.address {
        return Err(EnvelopeError::AddressMismatch {
            role: "sender",
            expected: sender.address.clone(),
            got: envelope.sender_address.clone(),
        });
    }
    if &envelope.receiver_address != receiver.address() {
        return Err(EnvelopeError::AddressMismatch {
            role: "receiver",
            expected: receiver.address().clone(),
            got: envelope.receiver_address.clone(),
        });
    }

    let ciphertext = BASE64
        .decode(&envelope.message)
        .map_err(|e| EnvelopeError::DecryptionFailed(format!("ciphertext not base64: {}", e)))?;
    let nonce: [u8; 24] = hex::decode(&envelope.nonce)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| EnvelopeError::DecryptionFailed("nonce must be 24 hex bytes".into()))?;
    let payload = EncryptedPayload { nonce, ciphertext };
    let plaintext = decrypt(&payload, &sender.box_key_bytes()?, receiver.keypair())
        .map_err(|e| EnvelopeError::DecryptionFailed(e.to_string()))?;

    if envelope_hash(&payload.ciphertext, &payload.nonce, envelope.created_at) != envelope.hash {
        tracing::warn!(sender = %envelope.sender_address, "envelope hash mismatch");
        return Err(EnvelopeError::HashMismatch);
    }

    let sender_key = sender.public_key()?;
    if verify_digest(&envelope.hash, &envelope.signature, &sender_key).is_err() {
        tracing::warn!(sender = %envelope.sender_address, "envelope signature invalid");
        return Err(EnvelopeError::SignatureInvalid);
    }

    let body: MessageBody = serde_json::from_slice(&plaintext)
        .map_err(|e| EnvelopeError::BodyParseError(e.to_string()))?;

    tracing::debug!(
        message_type = %body.body_type(),
        sender = %envelope.sender_address,
        "message opened"
    );

    Ok(Message {
        body,
        created_at: envelope.created_at,
        sender_address: envelope.sender_address.clone(),
        receiver_address: envelope.receiver_address.clone(),
    })
}
