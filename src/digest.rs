//! Keccak-256 digests used to bind artifacts together

use p3_keccak::Keccak256Hash;
use p3_symmetric::CryptographicHasher;

pub type Digest = [u8; 32];

/// Hash the concatenation of `parts`
pub fn keccak256<'a, I>(parts: I) -> Digest
where
    I: IntoIterator<Item = &'a [u8]>,
{
    Keccak256Hash.hash_iter_slices(parts)
}

/// `0x`-prefixed lowercase hex
pub fn to_hex(digest: &Digest) -> String {
    format!("0x{}", hex::encode(digest))
}
