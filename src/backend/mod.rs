//! Outer proof-system backend abstraction
//!
//! The pipeline talks to the PLONK backend only through [`PlonkBackend`], so
//! the packing and orchestration logic can run against any implementation.

pub mod digest;
pub mod proof;
pub mod r#trait;

pub use digest::DigestBackend;
pub use proof::{ConstraintSystem, Proof, ProvingKey, VerifyingKey};
pub use r#trait::{BackendError, BackendResult, PlonkBackend};
