pub mod encryption;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod signing;

pub use encryption::{box_public_key, decrypt, encrypt, EncryptedPayload};
pub use error::CryptoError;
pub use hashing::{create_commitment, generate_nonce, hash, hash_leaves, random_digest, verify_commitment};
pub use keys::{KeyPair, PublicKey};
pub use signing::{sign, sign_digest, verify, verify_digest, Signature};
