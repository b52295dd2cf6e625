//! Pipeline error taxonomy
//!
//! Every variant is fatal to the running stage; nothing is retried.

use thiserror::Error;

use crate::backend::BackendError;
use crate::packing::PackingError;
use crate::srs::SrsError;
use crate::store::{ArtifactKind, StoreError};

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that abort a Compile or Prove stage
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Oversized public input or unparsable bundle
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Missing artifact: {kind} at {location}")]
    MissingArtifact { kind: ArtifactKind, location: String },

    #[error("Corrupt artifact: {kind}: {reason}")]
    CorruptArtifact { kind: String, reason: String },

    #[error("I/O error on {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Backend error: {0}")]
    Backend(BackendError),

    #[error("Reference string provisioning failed: {0}")]
    Provisioning(SrsError),

    /// A freshly produced proof did not verify; nothing was persisted
    #[error("Self-check failed: {0}")]
    SelfCheckFailure(BackendError),

    /// Artifacts were not produced by the same Compile run as this circuit
    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),
}

impl From<PackingError> for PipelineError {
    fn from(err: PackingError) -> Self {
        PipelineError::MalformedInput(err.to_string())
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing { kind, location } => {
                PipelineError::MissingArtifact { kind, location }
            }
            StoreError::Io { kind, source } => PipelineError::Io {
                context: kind.to_string(),
                source,
            },
            StoreError::Corrupt { kind, reason } => PipelineError::CorruptArtifact {
                kind: kind.to_string(),
                reason,
            },
        }
    }
}

impl From<BackendError> for PipelineError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Corrupt { artifact, reason } => PipelineError::CorruptArtifact {
                kind: artifact.to_string(),
                reason,
            },
            other => PipelineError::Backend(other),
        }
    }
}

impl From<SrsError> for PipelineError {
    fn from(err: SrsError) -> Self {
        match err {
            SrsError::Store(store) => store.into(),
            other => PipelineError::Provisioning(other),
        }
    }
}
