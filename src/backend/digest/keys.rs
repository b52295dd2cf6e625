//! Key and proof encodings for the digest backend

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, BackendResult};
use crate::circuit::PublicWitness;
use crate::digest::{keccak256, Digest};

pub const NONCE_SIZE: usize = 32;
pub const PROOF_SIZE: usize = NONCE_SIZE + 32;

/// Outer field elements are written as 32-byte big-endian words
const WORD_SIZE: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestProvingKey {
    pub key_id: Digest,
    /// Hash of the constraint system this key was set up for
    pub circuit_digest: Digest,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestVerifyingKey {
    pub key_id: Digest,
    pub num_public: usize,
}

pub fn encode<T: Serialize>(value: &T, artifact: &'static str) -> BackendResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| BackendError::Setup(format!("{}: {}", artifact, e)))
}

pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8], artifact: &'static str) -> BackendResult<T> {
    bincode::deserialize(bytes).map_err(|e| BackendError::Corrupt {
        artifact,
        reason: e.to_string(),
    })
}

fn encode_word(value: &BigUint) -> [u8; WORD_SIZE] {
    let bytes = value.to_bytes_be();
    let mut word = [0u8; WORD_SIZE];
    // Callers check values against the outer modulus, which fits in one word
    let start = WORD_SIZE.saturating_sub(bytes.len());
    let skip = bytes.len().saturating_sub(WORD_SIZE);
    word[start..].copy_from_slice(&bytes[skip..]);
    word
}

/// Hash binding a proof to one key, one public witness and one nonce
pub fn proof_binding(key_id: &Digest, public: &PublicWitness, nonce: &[u8]) -> Digest {
    let words: Vec<u8> = public.0.iter().flat_map(encode_word).collect();
    keccak256([
        b"digest-backend/proof".as_slice(),
        key_id.as_slice(),
        words.as_slice(),
        nonce,
    ])
}
