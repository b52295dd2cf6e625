//! Deterministic reference backend
//!
//! Records the outer circuit as linear constraints over the BN254 scalar
//! field and checks witnesses exactly. Proofs are Keccak commitments binding
//! the verifying key to the public witness, so they carry no zero-knowledge
//! or succinctness guarantees. Verification still fails for the wrong key or
//! wrong public inputs, which is what the pipeline relies on.

mod constraints;
mod keys;

pub use constraints::{CompiledCircuit, Constraint, ConstraintRecorder, LinearCombination, Signal};

use tracing::{debug, info};

use self::keys::{DigestProvingKey, DigestVerifyingKey, NONCE_SIZE, PROOF_SIZE};
use crate::backend::{
    BackendError, BackendResult, ConstraintSystem, PlonkBackend, Proof, ProvingKey, VerifyingKey,
};
use crate::circuit::{
    CircuitDescriptor, InnerVerifier, PublicWitness, StructuralInnerVerifier, Witness,
};
use crate::digest::{keccak256, to_hex};
use crate::field::outer_modulus;
use crate::srs::ReferenceString;

pub struct DigestBackend {
    inner: Box<dyn InnerVerifier>,
}

impl DigestBackend {
    /// Backend that checks inner proofs structurally
    pub fn new() -> Self {
        Self::with_inner_verifier(Box::new(StructuralInnerVerifier))
    }

    pub fn with_inner_verifier(inner: Box<dyn InnerVerifier>) -> Self {
        Self { inner }
    }
}

impl Default for DigestBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PlonkBackend for DigestBackend {
    fn compile(&self, descriptor: &CircuitDescriptor) -> BackendResult<ConstraintSystem> {
        let mut recorder = ConstraintRecorder::new(descriptor.layout());
        descriptor.define(&mut recorder);
        let circuit = recorder.finish()?;

        info!(
            "Compiled outer circuit: {} public, {} private, {} constraints, {} gates",
            circuit.num_public,
            circuit.num_private,
            circuit.constraints.len(),
            circuit.gate_count()
        );
        Ok(ConstraintSystem::from_bytes(circuit.encode()?))
    }

    fn setup(
        &self,
        cs: &ConstraintSystem,
        srs: &ReferenceString,
    ) -> BackendResult<(ProvingKey, VerifyingKey)> {
        let circuit = CompiledCircuit::decode(cs.as_bytes())?;
        let required = circuit.required_srs_points();
        if srs.num_g1_points() < required {
            return Err(BackendError::Setup(format!(
                "reference string has {} G1 points, circuit needs {}",
                srs.num_g1_points(),
                required
            )));
        }

        let circuit_digest = keccak256([cs.as_bytes()]);
        let srs_digest = keccak256([srs.as_bytes()]);
        let key_id = keccak256([
            b"digest-backend/key".as_slice(),
            circuit_digest.as_slice(),
            srs_digest.as_slice(),
        ]);
        debug!("Setup key id {}", to_hex(&key_id));

        let pk = DigestProvingKey {
            key_id,
            circuit_digest,
        };
        let vk = DigestVerifyingKey {
            key_id,
            num_public: circuit.num_public,
        };
        Ok((
            ProvingKey::from_bytes(keys::encode(&pk, "proving key")?),
            VerifyingKey::from_bytes(keys::encode(&vk, "verifying key")?),
        ))
    }

    fn prove(
        &self,
        cs: &ConstraintSystem,
        pk: &ProvingKey,
        witness: &Witness,
    ) -> BackendResult<Proof> {
        let circuit = CompiledCircuit::decode(cs.as_bytes())?;
        let pk: DigestProvingKey = keys::decode(pk.as_bytes(), "proving key")?;
        if pk.circuit_digest != keccak256([cs.as_bytes()]) {
            return Err(BackendError::Prove(
                "proving key was not set up for this constraint system".to_string(),
            ));
        }

        circuit.check(witness, self.inner.as_ref())?;

        let nonce: [u8; NONCE_SIZE] = rand::random();
        let binding = keys::proof_binding(&pk.key_id, &witness.public(), &nonce);
        Ok(Proof::from_bytes([nonce, binding].concat()))
    }

    fn verify(
        &self,
        proof: &Proof,
        vk: &VerifyingKey,
        public_witness: &PublicWitness,
    ) -> BackendResult<()> {
        let vk: DigestVerifyingKey = keys::decode(vk.as_bytes(), "verifying key")?;
        if public_witness.0.len() != vk.num_public {
            return Err(BackendError::Verification(format!(
                "key expects {} public inputs, got {}",
                vk.num_public,
                public_witness.0.len()
            )));
        }
        if public_witness.0.iter().any(|v| v >= outer_modulus()) {
            return Err(BackendError::Verification(
                "public input is not an outer field element".to_string(),
            ));
        }
        if proof.len() != PROOF_SIZE {
            return Err(BackendError::Verification(format!(
                "proof is {} bytes, expected {}",
                proof.len(),
                PROOF_SIZE
            )));
        }

        let (nonce, binding) = proof.as_bytes().split_at(NONCE_SIZE);
        if keys::proof_binding(&vk.key_id, public_witness, nonce).as_slice() != binding {
            return Err(BackendError::Verification(
                "proof does not match verifying key and public inputs".to_string(),
            ));
        }
        Ok(())
    }

    fn export_verifier(&self, vk: &VerifyingKey) -> BackendResult<String> {
        let vk: DigestVerifyingKey = keys::decode(vk.as_bytes(), "verifying key")?;
        Ok(format!(
            "// SPDX-License-Identifier: MIT\n\
             // Verifier stub for the digest backend; not a PLONK verifier.\n\
             pragma solidity ^0.8.0;\n\
             \n\
             contract Verifier {{\n\
             \x20   bytes32 public constant KEY_ID = {};\n\
             \x20   uint256 public constant NUM_PUBLIC_INPUTS = {};\n\
             }}\n",
            to_hex(&vk.key_id),
            vk.num_public
        ))
    }

    fn name(&self) -> &str {
        "digest"
    }
}
