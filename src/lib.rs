//! Proof wrapper
//!
//! Wraps a Plonky2 proof over Goldilocks into a PLONK proof over the BN254
//! scalar field that an EVM contract can check cheaply.
//!
//! # Architecture
//!
//! The wrapper runs in two stages:
//! - Compile: build the outer verifier circuit for an inner proof bundle,
//!   provision the reference string, and derive proving and verifying keys
//! - Prove: prove the bundle against the stored keys, verify the result,
//!   and publish the proof with its compressed public inputs
//!
//! Inner public inputs are packed several to one outer public input to cut
//! on-chain verification cost.

pub mod backend;
pub mod bundle;
pub mod circuit;
pub mod config;
pub mod digest;
pub mod error;
pub mod field;
pub mod manifest;
pub mod packing;
pub mod pipeline;
pub mod proof;
pub mod srs;
pub mod store;

pub use backend::{DigestBackend, PlonkBackend};
pub use bundle::{ExportedBundle, ProofBundle};
pub use circuit::CircuitDescriptor;
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use field::FieldValue;
pub use packing::{pack, unpack, PackingParams};
pub use pipeline::Pipeline;
pub use proof::FinalProof;
pub use srs::{IgnitionSource, SrsProvisioner, SrsSource, TranscriptFileSource};
pub use store::{ArtifactKind, ArtifactStore, FileSystemStore, InMemoryStore};
