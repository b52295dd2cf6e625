//! Inner proof bundle types
//!
//! A bundle is the three JSON documents emitted by the inner (Plonky2) prover:
//! common circuit data, the proof with its public inputs, and the
//! verifier-only circuit data. Only the parts this crate interprets are typed;
//! the rest is carried as opaque JSON for the verifier-circuit builder.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PipelineError, PipelineResult};
use crate::field::FieldValue;

pub const COMMON_CIRCUIT_DATA_FILE: &str = "common_circuit_data.json";
pub const PROOF_WITH_PUBLIC_INPUTS_FILE: &str = "proof_with_public_inputs.json";
pub const VERIFIER_ONLY_CIRCUIT_DATA_FILE: &str = "verifier_only_circuit_data.json";

/// Inner proof body, consumed only by the verifier-circuit builder
pub type InnerProof = Value;

/// Parameters shared by the inner prover and verifier
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommonCircuitData {
    /// Number of public inputs the inner circuit exposes
    pub num_public_inputs: usize,
    /// Remaining parameters (config, FRI params, gates, ...)
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

/// Verifier-only data identifying the inner circuit (constants/sigmas cap, digest)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifierOnlyCircuitData(pub Value);

/// Inner proof together with its public inputs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofWithPublicInputs {
    pub proof: InnerProof,
    /// Raw Goldilocks limbs; may be non-canonical
    pub public_inputs: Vec<u64>,
}

/// The three documents as JSON strings, the shape used by in-process callers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportedBundle {
    pub proof_with_public_inputs: String,
    pub common_circuit_data: String,
    pub verifier_only_circuit_data: String,
}

/// A complete inner proof bundle, immutable once loaded
#[derive(Clone, Debug, PartialEq)]
pub struct ProofBundle {
    pub proof_with_public_inputs: ProofWithPublicInputs,
    pub common_data: CommonCircuitData,
    pub verifier_data: VerifierOnlyCircuitData,
}

impl ProofBundle {
    /// Load the three bundle files from `dir`
    pub fn load(dir: &Path) -> PipelineResult<Self> {
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|source| PipelineError::Io {
                context: path.display().to_string(),
                source,
            })
        };

        Self::from_json_strs(
            &read(PROOF_WITH_PUBLIC_INPUTS_FILE)?,
            &read(COMMON_CIRCUIT_DATA_FILE)?,
            &read(VERIFIER_ONLY_CIRCUIT_DATA_FILE)?,
        )
    }

    /// Write the three bundle files into `dir`
    pub fn save(&self, dir: &Path) -> PipelineResult<()> {
        let exported = self.export()?;
        let files = [
            (PROOF_WITH_PUBLIC_INPUTS_FILE, exported.proof_with_public_inputs),
            (COMMON_CIRCUIT_DATA_FILE, exported.common_circuit_data),
            (VERIFIER_ONLY_CIRCUIT_DATA_FILE, exported.verifier_only_circuit_data),
        ];
        for (name, contents) in files {
            let path = dir.join(name);
            fs::write(&path, contents).map_err(|source| PipelineError::Io {
                context: path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn from_exported(exported: &ExportedBundle) -> PipelineResult<Self> {
        Self::from_json_strs(
            &exported.proof_with_public_inputs,
            &exported.common_circuit_data,
            &exported.verifier_only_circuit_data,
        )
    }

    pub fn from_json_strs(
        proof_with_public_inputs: &str,
        common_circuit_data: &str,
        verifier_only_circuit_data: &str,
    ) -> PipelineResult<Self> {
        Ok(Self {
            proof_with_public_inputs: parse(PROOF_WITH_PUBLIC_INPUTS_FILE, proof_with_public_inputs)?,
            common_data: parse(COMMON_CIRCUIT_DATA_FILE, common_circuit_data)?,
            verifier_data: parse(VERIFIER_ONLY_CIRCUIT_DATA_FILE, verifier_only_circuit_data)?,
        })
    }

    pub fn export(&self) -> PipelineResult<ExportedBundle> {
        Ok(ExportedBundle {
            proof_with_public_inputs: render(&self.proof_with_public_inputs)?,
            common_circuit_data: render(&self.common_data)?,
            verifier_only_circuit_data: render(&self.verifier_data)?,
        })
    }

    /// Public inputs reduced into the inner field
    pub fn public_inputs(&self) -> Vec<FieldValue> {
        self.proof_with_public_inputs
            .public_inputs
            .iter()
            .copied()
            .map(FieldValue::reduce)
            .collect()
    }
}

fn parse<T: serde::de::DeserializeOwned>(name: &str, json: &str) -> PipelineResult<T> {
    serde_json::from_str(json)
        .map_err(|e| PipelineError::MalformedInput(format!("cannot parse {}: {}", name, e)))
}

fn render<T: Serialize>(value: &T) -> PipelineResult<String> {
    serde_json::to_string(value).map_err(|e| PipelineError::MalformedInput(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ProofBundle {
        ProofBundle::from_json_strs(
            &json!({ "proof": { "wires_cap": [[1, 2]] }, "public_inputs": [1, 2, 3] }).to_string(),
            &json!({ "num_public_inputs": 3, "degree_bits": 12 }).to_string(),
            &json!({ "constants_sigmas_cap": [[5, 6]], "circuit_digest": [7] }).to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_keeps_unknown_params() {
        let bundle = sample();
        assert_eq!(bundle.common_data.num_public_inputs, 3);
        assert_eq!(bundle.common_data.params["degree_bits"], json!(12));
        assert_eq!(bundle.proof_with_public_inputs.public_inputs, vec![1, 2, 3]);
    }

    #[test]
    fn test_public_inputs_are_reduced() {
        let mut bundle = sample();
        bundle.proof_with_public_inputs.public_inputs = vec![crate::field::INNER_MODULUS + 4];
        assert_eq!(bundle.public_inputs(), vec![FieldValue::reduce(4)]);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let err = ProofBundle::from_json_strs("{", "{}", "{}").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));

        // Common data without its public input count
        let err = ProofBundle::from_json_strs(
            r#"{"proof": {}, "public_inputs": []}"#,
            r#"{"degree_bits": 3}"#,
            "{}",
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[test]
    fn test_save_and_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = sample();
        bundle.save(dir.path()).unwrap();
        assert_eq!(ProofBundle::load(dir.path()).unwrap(), bundle);
    }

    #[test]
    fn test_exported_roundtrip() {
        let bundle = sample();
        let exported = bundle.export().unwrap();
        assert_eq!(ProofBundle::from_exported(&exported).unwrap(), bundle);
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProofBundle::load(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
