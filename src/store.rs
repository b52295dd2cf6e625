//! Artifact storage
//!
//! Each artifact kind lives at a fixed name inside the store. Artifacts are
//! written wholesale and never patched. There is no locking: one pipeline run
//! is assumed to own a store at a time.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Artifacts produced and consumed by the pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    ConstraintSystem,
    ProvingKey,
    VerifyingKey,
    ReferenceString,
    VerifierContract,
    FinalProof,
    Manifest,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 7] = [
        ArtifactKind::ConstraintSystem,
        ArtifactKind::ProvingKey,
        ArtifactKind::VerifyingKey,
        ArtifactKind::ReferenceString,
        ArtifactKind::VerifierContract,
        ArtifactKind::FinalProof,
        ArtifactKind::Manifest,
    ];

    /// File name inside the data directory
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::ConstraintSystem => "r1cs",
            ArtifactKind::ProvingKey => "proving.key",
            ArtifactKind::VerifyingKey => "verifying.key",
            ArtifactKind::ReferenceString => "srs_setup",
            ArtifactKind::VerifierContract => "verifier.sol",
            ArtifactKind::FinalProof => "final_proof.json",
            ArtifactKind::Manifest => "manifest.json",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::ConstraintSystem => "constraint system",
            ArtifactKind::ProvingKey => "proving key",
            ArtifactKind::VerifyingKey => "verifying key",
            ArtifactKind::ReferenceString => "reference string",
            ArtifactKind::VerifierContract => "verifier contract",
            ArtifactKind::FinalProof => "final proof",
            ArtifactKind::Manifest => "artifact manifest",
        };
        f.write_str(name)
    }
}

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found at {location}")]
    Missing { kind: ArtifactKind, location: String },

    #[error("cannot access {kind}: {source}")]
    Io {
        kind: ArtifactKind,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} cannot be decoded: {reason}")]
    Corrupt { kind: ArtifactKind, reason: String },
}

/// Byte-level artifact storage
pub trait ArtifactStore {
    /// Replace the stored artifact with `bytes`
    fn save(&mut self, kind: ArtifactKind, bytes: &[u8]) -> Result<(), StoreError>;

    /// Read the stored artifact
    fn load(&self, kind: ArtifactKind) -> Result<Vec<u8>, StoreError>;

    fn contains(&self, kind: ArtifactKind) -> bool;

    /// Human-readable location of an artifact, for diagnostics
    fn location(&self, kind: ArtifactKind) -> String;

    fn save_json<T: Serialize>(&mut self, kind: ArtifactKind, value: &T) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Corrupt {
            kind,
            reason: e.to_string(),
        })?;
        self.save(kind, &bytes)
    }

    fn load_json<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<T, StoreError>
    where
        Self: Sized,
    {
        let bytes = self.load(kind)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            kind,
            reason: e.to_string(),
        })
    }
}

/// Artifacts kept as files under one data directory
#[derive(Clone, Debug)]
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.file_name())
    }
}

impl ArtifactStore for FileSystemStore {
    fn save(&mut self, kind: ArtifactKind, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path(kind);
        // Write beside the target and rename so a crash never leaves half an artifact
        let tmp = path.with_extension("partial");
        fs::write(&tmp, bytes).map_err(|source| StoreError::Io { kind, source })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { kind, source })?;
        debug!("Saved {} ({} bytes) to {:?}", kind, bytes.len(), path);
        Ok(())
    }

    fn load(&self, kind: ArtifactKind) -> Result<Vec<u8>, StoreError> {
        let path = self.path(kind);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!("Loaded {} ({} bytes) from {:?}", kind, bytes.len(), path);
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::Missing {
                kind,
                location: path.display().to_string(),
            }),
            Err(source) => Err(StoreError::Io { kind, source }),
        }
    }

    fn contains(&self, kind: ArtifactKind) -> bool {
        self.path(kind).is_file()
    }

    fn location(&self, kind: ArtifactKind) -> String {
        self.path(kind).display().to_string()
    }
}

/// Artifacts kept in memory, for tests and in-process use
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    artifacts: BTreeMap<ArtifactKind, Vec<u8>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&mut self, kind: ArtifactKind) -> Option<Vec<u8>> {
        self.artifacts.remove(&kind)
    }
}

impl ArtifactStore for InMemoryStore {
    fn save(&mut self, kind: ArtifactKind, bytes: &[u8]) -> Result<(), StoreError> {
        self.artifacts.insert(kind, bytes.to_vec());
        Ok(())
    }

    fn load(&self, kind: ArtifactKind) -> Result<Vec<u8>, StoreError> {
        self.artifacts
            .get(&kind)
            .cloned()
            .ok_or_else(|| StoreError::Missing {
                kind,
                location: self.location(kind),
            })
    }

    fn contains(&self, kind: ArtifactKind) -> bool {
        self.artifacts.contains_key(&kind)
    }

    fn location(&self, kind: ArtifactKind) -> String {
        format!("memory:{}", kind.file_name())
    }
}
