//! Public input compression
//!
//! The outer backend charges per public input, so several small inner public
//! inputs are packed big-endian into one outer field element. Group `i` holds
//! inputs `i*k .. i*k+k`, the first of them in the most significant slot:
//!
//! ```text
//! compressed[i] = sum_j values[i*k + j] * 2^(B * (k - 1 - j))
//! ```
//!
//! A short final group simply has fewer terms, so its present values keep the
//! high slots and the low slots stay zero.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::{FieldValue, OUTER_CAPACITY_BITS};

/// An outer public input carrying `factor` packed inner values
pub type CompressedInput = BigUint;

/// Packing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackingError {
    #[error("Public input value too big at index {index}: expected < 2^{bits}, got {value}")]
    Oversized { index: usize, value: u64, bits: u32 },

    #[error("Invalid packing parameters: {0}")]
    InvalidParams(String),
}

/// Compression factor `k` and slot width `B`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackingParams {
    /// Number of inner public inputs per outer public input
    pub factor: usize,
    /// Bits reserved for each inner public input
    pub bits: u32,
}

impl PackingParams {
    /// Six 32-bit values per outer public input
    pub const COMPRESSED: Self = Self {
        factor: 6,
        bits: 32,
    };

    /// One full inner field element per outer public input
    pub const UNCOMPRESSED: Self = Self {
        factor: 1,
        bits: 64,
    };

    pub fn new(factor: usize, bits: u32) -> Result<Self, PackingError> {
        let params = Self { factor, bits };
        params.validate()?;
        Ok(params)
    }

    /// Select between the compressed and one-to-one layouts
    pub fn for_compression(compress: bool) -> Self {
        if compress {
            Self::COMPRESSED
        } else {
            Self::UNCOMPRESSED
        }
    }

    /// Check that a full group fits below the outer field modulus
    pub fn validate(&self) -> Result<(), PackingError> {
        if self.factor == 0 {
            return Err(PackingError::InvalidParams(
                "compression factor must be positive".to_string(),
            ));
        }
        if self.bits == 0 || self.bits > 64 {
            return Err(PackingError::InvalidParams(format!(
                "slot width must be in 1..=64 bits, got {}",
                self.bits
            )));
        }
        let total = (self.factor as u64).saturating_mul(u64::from(self.bits));
        if total > u64::from(OUTER_CAPACITY_BITS) {
            return Err(PackingError::InvalidParams(format!(
                "{} slots of {} bits exceed the {}-bit outer field capacity",
                self.factor, self.bits, OUTER_CAPACITY_BITS
            )));
        }
        Ok(())
    }

    /// Number of outer public inputs needed for `n` inner public inputs
    pub fn compressed_len(&self, n: usize) -> usize {
        n.div_ceil(self.factor)
    }

    /// Left shift applied to the value in slot `j` of a group
    pub fn slot_shift(&self, j: usize) -> u32 {
        self.bits * (self.factor - 1 - j) as u32
    }

    /// `2^shift` for slot `j`
    pub fn slot_weight(&self, j: usize) -> BigUint {
        BigUint::from(1u8) << self.slot_shift(j)
    }

    /// Fail if `value` does not fit in one slot
    pub fn check_bound(&self, index: usize, value: FieldValue) -> Result<(), PackingError> {
        let fits = self.bits >= 64 || value.as_u64() < (1u64 << self.bits);
        if fits {
            Ok(())
        } else {
            Err(PackingError::Oversized {
                index,
                value: value.as_u64(),
                bits: self.bits,
            })
        }
    }
}

impl Default for PackingParams {
    fn default() -> Self {
        Self::COMPRESSED
    }
}

/// Pack inner public inputs into `ceil(n / k)` compressed inputs.
///
/// Every value is bound-checked first; nothing is truncated.
pub fn pack(
    values: &[FieldValue],
    params: PackingParams,
) -> Result<Vec<CompressedInput>, PackingError> {
    params.validate()?;
    for (index, value) in values.iter().enumerate() {
        params.check_bound(index, *value)?;
    }

    let compressed = values
        .chunks(params.factor)
        .map(|group| {
            group
                .iter()
                .enumerate()
                .fold(BigUint::default(), |acc, (j, value)| {
                    acc + (BigUint::from(value.as_u64()) << params.slot_shift(j))
                })
        })
        .collect();

    Ok(compressed)
}

/// Split a compressed input back into its `k` slots, most significant first
pub fn unpack(compressed: &CompressedInput, params: PackingParams) -> Vec<u64> {
    let mask = (BigUint::from(1u8) << params.bits) - 1u8;
    (0..params.factor)
        .map(|j| {
            let slot = (compressed >> params.slot_shift(j)) & &mask;
            slot.iter_u64_digits().next().unwrap_or(0)
        })
        .collect()
}
