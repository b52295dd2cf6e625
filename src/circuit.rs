//! Outer circuit definition
//!
//! The outer circuit has one public signal per compressed input and carries
//! the whole inner proof bundle as private signals. It asserts two things:
//! the inner proof verifies against the inner circuit data, and every declared
//! compressed input equals the packing of the private inner public inputs.

use num_bigint::BigUint;

use crate::bundle::{CommonCircuitData, InnerProof, ProofBundle, VerifierOnlyCircuitData};
use crate::digest::{keccak256, Digest};
use crate::error::{PipelineError, PipelineResult};
use crate::field::FieldValue;
use crate::packing::{self, CompressedInput, PackingParams};

/// Constraint-building interface a backend exposes to circuit definitions
pub trait CircuitBuilder {
    type Var: Clone;

    /// Public signal `index` (a compressed input)
    fn public_input(&mut self, index: usize) -> Self::Var;

    /// Private signal `index` (an inner public input)
    fn private_input(&mut self, index: usize) -> Self::Var;

    fn constant(&mut self, value: BigUint) -> Self::Var;

    fn add(&mut self, a: Self::Var, b: Self::Var) -> Self::Var;

    fn mul(&mut self, a: Self::Var, b: Self::Var) -> Self::Var;

    fn assert_eq(&mut self, a: Self::Var, b: Self::Var);

    /// Emit the inner verifier pinned to `common` and `verifier_data`: the
    /// private proof and inner public inputs must verify against them
    fn verify_inner_proof(
        &mut self,
        common: &CommonCircuitData,
        verifier_data: &VerifierOnlyCircuitData,
    );
}

/// External inner-proof verifier, invoked by backends when filling the witness
pub trait InnerVerifier {
    fn verify(
        &self,
        common: &CommonCircuitData,
        verifier_data: &VerifierOnlyCircuitData,
        proof: &InnerProof,
        public_inputs: &[FieldValue],
    ) -> Result<(), String>;
}

/// Checks that a bundle is shaped like a proof for `common`.
///
/// Does not check the inner proof cryptographically.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralInnerVerifier;

impl InnerVerifier for StructuralInnerVerifier {
    fn verify(
        &self,
        common: &CommonCircuitData,
        verifier_data: &VerifierOnlyCircuitData,
        proof: &InnerProof,
        public_inputs: &[FieldValue],
    ) -> Result<(), String> {
        if public_inputs.len() != common.num_public_inputs {
            return Err(format!(
                "inner circuit has {} public inputs, proof carries {}",
                common.num_public_inputs,
                public_inputs.len()
            ));
        }
        if !proof.is_object() {
            return Err("inner proof is not an object".to_string());
        }
        if verifier_data.0.is_null() {
            return Err("verifier-only circuit data is empty".to_string());
        }
        Ok(())
    }
}

/// Number of public and private signals
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalLayout {
    pub num_public: usize,
    pub num_private: usize,
}

/// Full assignment of the outer circuit's signals
#[derive(Clone, Debug, PartialEq)]
pub struct Witness {
    pub public: Vec<BigUint>,
    pub private: Vec<FieldValue>,
    pub proof: InnerProof,
    pub verifier_data: VerifierOnlyCircuitData,
}

/// Public part of a witness, all a verifier sees
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicWitness(pub Vec<BigUint>);

impl Witness {
    pub fn public(&self) -> PublicWitness {
        PublicWitness(self.public.clone())
    }
}

/// The assembled outer circuit for one inner proof bundle
#[derive(Clone, Debug)]
pub struct CircuitDescriptor {
    compressed_public_inputs: Vec<CompressedInput>,
    public_inputs: Vec<FieldValue>,
    proof: InnerProof,
    verifier_data: VerifierOnlyCircuitData,
    common_data: CommonCircuitData,
    packing: PackingParams,
    shape: Digest,
}

impl CircuitDescriptor {
    /// Build the circuit for `bundle`.
    ///
    /// Fails with `MalformedInput` when a reduced public input does not fit
    /// in one packing slot.
    pub fn new(bundle: ProofBundle, packing: PackingParams) -> PipelineResult<Self> {
        let public_inputs = bundle.public_inputs();
        let compressed_public_inputs = packing::pack(&public_inputs, packing)?;
        let shape = shape_digest(
            &bundle.common_data,
            &bundle.verifier_data,
            public_inputs.len(),
            packing,
        )?;

        Ok(Self {
            compressed_public_inputs,
            public_inputs,
            proof: bundle.proof_with_public_inputs.proof,
            verifier_data: bundle.verifier_data,
            common_data: bundle.common_data,
            packing,
            shape,
        })
    }

    pub fn layout(&self) -> SignalLayout {
        SignalLayout {
            num_public: self.compressed_public_inputs.len(),
            num_private: self.public_inputs.len(),
        }
    }

    /// Declared outer public inputs
    pub fn compressed_public_inputs(&self) -> &[CompressedInput] {
        &self.compressed_public_inputs
    }

    /// Digest of everything that determines the constraint system
    pub fn shape_digest(&self) -> Digest {
        self.shape
    }

    /// Emit the circuit's constraints into `builder`
    pub fn define<B: CircuitBuilder>(&self, builder: &mut B) {
        builder.verify_inner_proof(&self.common_data, &self.verifier_data);

        let num_private = self.public_inputs.len();
        for i in 0..self.compressed_public_inputs.len() {
            let mut compressed = builder.constant(BigUint::default());
            for j in 0..self.packing.factor {
                let idx = i * self.packing.factor + j;
                if idx >= num_private {
                    break;
                }

                let limb = builder.private_input(idx);
                let weight = builder.constant(self.packing.slot_weight(j));
                let term = builder.mul(limb, weight);
                compressed = builder.add(compressed, term);
            }

            let declared = builder.public_input(i);
            builder.assert_eq(declared, compressed);
        }
    }

    /// Assignment for every signal, public and private
    pub fn witness(&self) -> Witness {
        Witness {
            public: self.compressed_public_inputs.clone(),
            private: self.public_inputs.clone(),
            proof: self.proof.clone(),
            verifier_data: self.verifier_data.clone(),
        }
    }
}

fn shape_digest(
    common: &CommonCircuitData,
    verifier_data: &VerifierOnlyCircuitData,
    num_public_inputs: usize,
    packing: PackingParams,
) -> PipelineResult<Digest> {
    let encode = |value: serde_json::Result<Vec<u8>>| {
        value.map_err(|e| PipelineError::MalformedInput(e.to_string()))
    };
    let common = encode(serde_json::to_vec(common))?;
    let verifier = encode(serde_json::to_vec(verifier_data))?;
    let counts = [
        (num_public_inputs as u64).to_le_bytes(),
        (packing.factor as u64).to_le_bytes(),
        u64::from(packing.bits).to_le_bytes(),
    ]
    .concat();

    Ok(keccak256([
        b"circuit-shape/v1".as_slice(),
        common.as_slice(),
        verifier.as_slice(),
        counts.as_slice(),
    ]))
}
