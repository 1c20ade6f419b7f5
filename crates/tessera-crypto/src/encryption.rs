use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::keys::KeyPair;

/// Authenticated box: sender and recipient static X25519 keys agree on a
/// XChaCha20-Poly1305 key, so only the holder of either secret can open it
/// and the recipient learns which sender key sealed it.
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    /// 24-byte XChaCha20 nonce.
    pub nonce: [u8; 24],
    /// Encrypted data (ciphertext + 16-byte Poly1305 tag).
    pub ciphertext: Vec<u8>,
}

/// Derive an X25519 static secret from an Ed25519 key pair's seed.
fn derive_x25519_secret(keypair: &KeyPair) -> StaticSecret {
    keypair.with_seed(|seed| {
        StaticSecret::from(blake3::derive_key("tessera-x25519-key-derivation-v1", seed))
    })
}

fn box_key(secret: &StaticSecret, peer_pubkey: &[u8; 32]) -> [u8; 32] {
    let peer = X25519PublicKey::from(*peer_pubkey);
    let shared = secret.diffie_hellman(&peer);
    blake3::derive_key("tessera-box-v1", shared.as_bytes())
}

/// The X25519 public key peers must use to encrypt for this key pair.
pub fn box_public_key(keypair: &KeyPair) -> [u8; 32] {
    let secret = derive_x25519_secret(keypair);
    X25519PublicKey::from(&secret).to_bytes()
}

/// Encrypt plaintext from `sender` to the holder of `recipient_box_pubkey`.
pub fn encrypt(
    plaintext: &[u8],
    sender: &KeyPair,
    recipient_box_pubkey: &[u8; 32],
) -> Result<EncryptedPayload, CryptoError> {
    let secret = derive_x25519_secret(sender);
    let mut key = box_key(&secret, recipient_box_pubkey);

    let mut nonce_bytes = [0u8; 24];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = XChaCha20Poly1305::new_from_slice(&key).map_err(|_| CryptoError::Seal);
    key.zeroize();
    let ciphertext = cipher?
        .encrypt(XNonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CryptoError::Seal)?;

    Ok(EncryptedPayload {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt a payload sealed by the holder of `sender_box_pubkey`.
pub fn decrypt(
    payload: &EncryptedPayload,
    sender_box_pubkey: &[u8; 32],
    recipient: &KeyPair,
) -> Result<Vec<u8>, CryptoError> {
    let secret = derive_x25519_secret(recipient);
    let mut key = box_key(&secret, sender_box_pubkey);

    let cipher = XChaCha20Poly1305::new_from_slice(&key).map_err(|_| CryptoError::Open);
    key.zeroize();
    cipher?
        .decrypt(XNonce::from_slice(&payload.nonce), payload.ciphertext.as_slice())
        .map_err(|_| CryptoError::Open)
}
