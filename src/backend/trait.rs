//! Backend trait definition
//!
//! A backend provides four capabilities: compile a circuit descriptor into a
//! constraint system, run setup against a reference string, prove a witness,
//! and verify a proof against a public witness. Artifacts cross this boundary
//! as backend-native bytes.

use super::proof::{ConstraintSystem, Proof, ProvingKey, VerifyingKey};
use crate::circuit::{CircuitDescriptor, PublicWitness, Witness};
use crate::srs::ReferenceString;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors surfaced by a backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Compilation failed: {0}")]
    Compile(String),

    /// Includes reference strings too small for the circuit
    #[error("Setup failed: {0}")]
    Setup(String),

    /// The witness does not satisfy the circuit
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Proof generation failed: {0}")]
    Prove(String),

    /// The proof is invalid for the given key and public witness
    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Cannot decode {artifact}: {reason}")]
    Corrupt {
        artifact: &'static str,
        reason: String,
    },
}

/// PLONK-style proof system backend
pub trait PlonkBackend {
    /// Compile the outer circuit into a constraint system
    fn compile(&self, descriptor: &CircuitDescriptor) -> BackendResult<ConstraintSystem>;

    /// Derive proving and verifying keys.
    ///
    /// Fails when `srs` is too small for the constraint system.
    fn setup(
        &self,
        cs: &ConstraintSystem,
        srs: &ReferenceString,
    ) -> BackendResult<(ProvingKey, VerifyingKey)>;

    /// Prove that `witness` satisfies `cs`
    fn prove(
        &self,
        cs: &ConstraintSystem,
        pk: &ProvingKey,
        witness: &Witness,
    ) -> BackendResult<Proof>;

    /// Check `proof` against `vk` and the public part of the witness
    fn verify(
        &self,
        proof: &Proof,
        vk: &VerifyingKey,
        public_witness: &PublicWitness,
    ) -> BackendResult<()>;

    /// Render an on-chain verifier for `vk`; the text is opaque to the pipeline
    fn export_verifier(&self, vk: &VerifyingKey) -> BackendResult<String>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
