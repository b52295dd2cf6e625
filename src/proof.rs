//! Final proof result
//!
//! The published result is JSON: `{"proof": "0x..", "public_inputs": ["..", ..]}`
//! with the compressed public inputs as decimal strings.

use std::path::Path;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::backend::Proof;
use crate::error::{PipelineError, PipelineResult};
use crate::packing::CompressedInput;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalProof {
    /// `0x`-prefixed hex of the backend proof
    pub proof: String,
    /// Compressed public inputs in decimal
    pub public_inputs: Vec<String>,
}

impl FinalProof {
    pub fn new(proof: &Proof, public_inputs: &[CompressedInput]) -> Self {
        Self {
            proof: format!("0x{}", hex::encode(proof.as_bytes())),
            public_inputs: public_inputs.iter().map(|v| v.to_str_radix(10)).collect(),
        }
    }

    /// Decode the proof hex
    pub fn proof_bytes(&self) -> PipelineResult<Vec<u8>> {
        let digits = self.proof.strip_prefix("0x").unwrap_or(&self.proof);
        hex::decode(digits).map_err(|e| corrupt(format!("proof is not hex: {}", e)))
    }

    /// Parse the decimal public inputs
    pub fn compressed_inputs(&self) -> PipelineResult<Vec<CompressedInput>> {
        self.public_inputs
            .iter()
            .map(|s| {
                BigUint::parse_bytes(s.as_bytes(), 10)
                    .ok_or_else(|| corrupt(format!("public input {:?} is not a decimal integer", s)))
            })
            .collect()
    }

    pub fn to_json(&self) -> PipelineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| corrupt(e.to_string()))
    }

    pub fn from_json(json: &str) -> PipelineResult<Self> {
        serde_json::from_str(json).map_err(|e| corrupt(e.to_string()))
    }

    /// Read a stored `final_proof.json`
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            context: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

fn corrupt(reason: String) -> PipelineError {
    PipelineError::CorruptArtifact {
        kind: "final proof".to_string(),
        reason,
    }
}
