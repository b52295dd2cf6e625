//! Inner (Goldilocks) and outer (BN254 scalar) field parameters

use std::fmt;
use std::sync::OnceLock;

use num_bigint::BigUint;
use p3_field::{AbstractField, PrimeField64};
use p3_goldilocks::Goldilocks;
use serde::{Deserialize, Serialize};

/// Field of the inner (Plonky2) proof system: p = 2^64 - 2^32 + 1
pub type InnerField = Goldilocks;

/// Goldilocks prime
pub const INNER_MODULUS: u64 = <Goldilocks as PrimeField64>::ORDER_U64;

/// BN254 scalar field modulus, the native field of the outer circuit
const OUTER_MODULUS_DEC: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// Number of bits that always fit into an outer field element
pub const OUTER_CAPACITY_BITS: u32 = 253;

/// The outer field modulus as a big integer
pub fn outer_modulus() -> &'static BigUint {
    static MODULUS: OnceLock<BigUint> = OnceLock::new();
    MODULUS.get_or_init(|| {
        BigUint::parse_bytes(OUTER_MODULUS_DEC.as_bytes(), 10)
            .unwrap_or_else(|| unreachable!("modulus literal is valid decimal"))
    })
}

/// A canonical element of the inner field.
///
/// Raw limbs coming from a proof bundle may be non-canonical; they are reduced
/// once on construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValue(u64);

impl FieldValue {
    /// Reduce a raw limb modulo the inner field
    pub fn reduce(limb: u64) -> Self {
        Self(InnerField::from_wrapped_u64(limb).as_canonical_u64())
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<InnerField> for FieldValue {
    fn from(value: InnerField) -> Self {
        Self(value.as_canonical_u64())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
