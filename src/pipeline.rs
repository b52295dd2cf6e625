//! Compile and Prove stages
//!
//! Each stage runs its steps strictly in order and stops at the first error.
//! Artifacts are written only after every step that produces them has
//! succeeded, so a failed stage leaves earlier artifacts untouched.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::backend::{BackendError, ConstraintSystem, PlonkBackend, ProvingKey, VerifyingKey};
use crate::bundle::{ExportedBundle, ProofBundle};
use crate::circuit::CircuitDescriptor;
use crate::config::PipelineConfig;
use crate::digest::to_hex;
use crate::error::{PipelineError, PipelineResult};
use crate::manifest::ArtifactManifest;
use crate::proof::FinalProof;
use crate::srs::SrsProvisioner;
use crate::store::{ArtifactKind, ArtifactStore};

/// Wraps inner proof bundles into outer proofs
pub struct Pipeline<S, B> {
    config: PipelineConfig,
    store: S,
    backend: B,
    provisioner: SrsProvisioner,
}

impl<S: ArtifactStore, B: PlonkBackend> Pipeline<S, B> {
    pub fn new(config: PipelineConfig, store: S, backend: B, provisioner: SrsProvisioner) -> Self {
        Self {
            config,
            store,
            backend,
            provisioner,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Compile the outer circuit for `bundle` and derive its keys.
    ///
    /// Writes the constraint system, both keys, the verifier contract, the
    /// manifest and (on first use) the reference string.
    pub fn compile(&mut self, bundle: ProofBundle) -> PipelineResult<()> {
        info!(
            "Compiling outer circuit ({} backend, k = {}, B = {})",
            self.backend.name(),
            self.config.packing.factor,
            self.config.packing.bits
        );

        let descriptor = CircuitDescriptor::new(bundle, self.config.packing)?;
        let layout = descriptor.layout();
        info!(
            "Circuit has {} outer public inputs for {} inner public inputs",
            layout.num_public, layout.num_private
        );

        let cs = self.backend.compile(&descriptor)?;
        debug!("Constraint system is {} bytes", cs.len());

        let srs = self
            .provisioner
            .ensure(&mut self.store, self.config.srs_size)?;

        info!("Running setup");
        let (pk, vk) = self.backend.setup(&cs, &srs)?;
        let contract = self.backend.export_verifier(&vk)?;
        let manifest = ArtifactManifest::new(
            self.backend.name(),
            &descriptor.shape_digest(),
            &cs,
            &pk,
            &vk,
            &srs,
        );

        self.store.save(ArtifactKind::ConstraintSystem, cs.as_bytes())?;
        self.store.save(ArtifactKind::ProvingKey, pk.as_bytes())?;
        self.store.save(ArtifactKind::VerifyingKey, vk.as_bytes())?;
        self.store
            .save(ArtifactKind::VerifierContract, contract.as_bytes())?;
        self.store.save_json(ArtifactKind::Manifest, &manifest)?;

        info!(
            "Compiled circuit {} into {}",
            to_hex(&descriptor.shape_digest()),
            self.store.location(ArtifactKind::ConstraintSystem)
        );
        Ok(())
    }

    /// Prove `bundle` against the stored artifacts.
    ///
    /// The proof is verified before it is written; a proof that fails its own
    /// check is never persisted.
    pub fn prove(&mut self, bundle: ProofBundle) -> PipelineResult<FinalProof> {
        info!("Proving with {} backend", self.backend.name());

        let cs = ConstraintSystem::from_bytes(self.store.load(ArtifactKind::ConstraintSystem)?);
        let pk = ProvingKey::from_bytes(self.store.load(ArtifactKind::ProvingKey)?);
        let vk = VerifyingKey::from_bytes(self.store.load(ArtifactKind::VerifyingKey)?);

        let descriptor = CircuitDescriptor::new(bundle, self.config.packing)?;
        self.check_manifest(&descriptor, &cs, &pk, &vk)?;

        let witness = descriptor.witness();
        let public_witness = witness.public();

        let proof = self.backend.prove(&cs, &pk, &witness)?;
        debug!("Proof is {} bytes", proof.len());

        self.backend
            .verify(&proof, &vk, &public_witness)
            .map_err(|e| match e {
                BackendError::Corrupt { .. } => PipelineError::from(e),
                other => PipelineError::SelfCheckFailure(other),
            })?;
        info!("Proof verified");

        let final_proof = FinalProof::new(&proof, descriptor.compressed_public_inputs());
        self.store.save_json(ArtifactKind::FinalProof, &final_proof)?;
        info!(
            "Saved final proof with {} public inputs to {}",
            final_proof.public_inputs.len(),
            self.store.location(ArtifactKind::FinalProof)
        );
        Ok(final_proof)
    }

    /// Compile a bundle handed over in-process as three JSON strings
    pub fn compile_bundle(&mut self, exported: &ExportedBundle) -> PipelineResult<()> {
        self.compile(ProofBundle::from_exported(exported)?)
    }

    /// Prove a bundle handed over in-process as three JSON strings
    pub fn prove_bundle(&mut self, exported: &ExportedBundle) -> PipelineResult<FinalProof> {
        self.prove(ProofBundle::from_exported(exported)?)
    }

    /// Run Prove, preceded by Compile when `compile` is set.
    ///
    /// The bundle is read from `bundle_dir` separately for each stage.
    pub fn run(&mut self, bundle_dir: &Path, compile: bool) -> PipelineResult<FinalProof> {
        if compile {
            self.compile(ProofBundle::load(bundle_dir)?)?;
        } else {
            debug!("Skipping compile, reusing stored artifacts");
        }
        self.prove(ProofBundle::load(bundle_dir)?)
    }

    fn check_manifest(
        &self,
        descriptor: &CircuitDescriptor,
        cs: &ConstraintSystem,
        pk: &ProvingKey,
        vk: &VerifyingKey,
    ) -> PipelineResult<()> {
        if !self.store.contains(ArtifactKind::Manifest) {
            warn!(
                "No artifact manifest at {}; cannot check artifacts belong to this circuit",
                self.store.location(ArtifactKind::Manifest)
            );
            return Ok(());
        }

        let manifest: ArtifactManifest = self.store.load_json(ArtifactKind::Manifest)?;
        manifest.check(
            self.backend.name(),
            &descriptor.shape_digest(),
            cs,
            pk,
            vk,
        )
    }
}
