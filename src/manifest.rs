//! Binding between a circuit and the artifacts compiled for it
//!
//! Compile records a digest of each artifact it writes. Prove refuses to run
//! when the loaded artifacts or the bundle's circuit shape differ from what
//! was recorded.

use serde::{Deserialize, Serialize};

use crate::backend::{ConstraintSystem, ProvingKey, VerifyingKey};
use crate::digest::{keccak256, to_hex, Digest};
use crate::error::{PipelineError, PipelineResult};
use crate::srs::ReferenceString;

/// Digests written next to the artifacts as `manifest.json`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub backend: String,
    pub circuit_shape: String,
    pub constraint_system: String,
    pub proving_key: String,
    pub verifying_key: String,
    pub reference_string: String,
}

fn digest_of(bytes: &[u8]) -> String {
    to_hex(&keccak256([bytes]))
}

impl ArtifactManifest {
    pub fn new(
        backend: &str,
        shape: &Digest,
        cs: &ConstraintSystem,
        pk: &ProvingKey,
        vk: &VerifyingKey,
        srs: &ReferenceString,
    ) -> Self {
        Self {
            backend: backend.to_string(),
            circuit_shape: to_hex(shape),
            constraint_system: digest_of(cs.as_bytes()),
            proving_key: digest_of(pk.as_bytes()),
            verifying_key: digest_of(vk.as_bytes()),
            reference_string: digest_of(srs.as_bytes()),
        }
    }

    /// Check the artifacts loaded for proving against the recorded digests
    pub fn check(
        &self,
        backend: &str,
        shape: &Digest,
        cs: &ConstraintSystem,
        pk: &ProvingKey,
        vk: &VerifyingKey,
    ) -> PipelineResult<()> {
        if self.backend != backend {
            return Err(PipelineError::ArtifactMismatch(format!(
                "artifacts were compiled by the {} backend, not {}",
                self.backend, backend
            )));
        }
        if self.circuit_shape != to_hex(shape) {
            return Err(PipelineError::ArtifactMismatch(
                "proof bundle does not describe the compiled circuit".to_string(),
            ));
        }

        let artifacts = [
            ("constraint system", &self.constraint_system, cs.as_bytes()),
            ("proving key", &self.proving_key, pk.as_bytes()),
            ("verifying key", &self.verifying_key, vk.as_bytes()),
        ];
        for (name, recorded, bytes) in artifacts {
            if *recorded != digest_of(bytes) {
                return Err(PipelineError::ArtifactMismatch(format!(
                    "{} was not produced by the recorded compile run",
                    name
                )));
            }
        }
        Ok(())
    }
}
