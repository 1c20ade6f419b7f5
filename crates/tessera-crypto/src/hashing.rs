use rand::RngCore;
use tessera_core::Digest;

/// Hash arbitrary data using BLAKE3.
pub fn hash(data: &[u8]) -> Digest {
    Digest(*blake3::hash(data).as_bytes())
}

/// Create a BLAKE3 commitment: H(value || nonce).
pub fn create_commitment(value: &[u8], nonce: &[u8]) -> Digest {
    let mut input = Vec::with_capacity(value.len() + nonce.len());
    input.extend_from_slice(value);
    input.extend_from_slice(nonce);
    hash(&input)
}

/// Verify a BLAKE3 commitment by recomputing H(value || nonce).
pub fn verify_commitment(value: &[u8], nonce: &[u8], commitment: &Digest) -> bool {
    create_commitment(value, nonce) == *commitment
}

/// Combine commitment leaves into a root hash.
///
/// A single leaf is returned as-is, unhashed. Any other count hashes the
/// concatenation of all leaves in order. This is a flat hash, not a Merkle
/// tree.
pub fn hash_leaves(leaves: &[Digest]) -> Digest {
    if leaves.len() == 1 {
        return leaves[0];
    }
    let mut input = Vec::with_capacity(leaves.len() * Digest::LEN);
    for leaf in leaves {
        input.extend_from_slice(leaf.as_bytes());
    }
    hash(&input)
}

/// Fresh commitment nonce: 32 random bytes, hex-encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Random 32-byte identifier.
pub fn random_digest() -> Digest {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    Digest(bytes)
}
