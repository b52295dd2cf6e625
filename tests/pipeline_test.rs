//! End-to-end Compile and Prove runs against in-memory and on-disk stores

use std::cell::Cell;
use std::rc::Rc;

use num_bigint::BigUint;
use proptest::prelude::*;
use serde_json::json;

use proof_wrapper::backend::digest::{CompiledCircuit, Constraint, LinearCombination, Signal};
use proof_wrapper::backend::{BackendError, VerifyingKey};
use proof_wrapper::bundle::{CommonCircuitData, InnerProof, VerifierOnlyCircuitData};
use proof_wrapper::circuit::{InnerVerifier, PublicWitness};
use proof_wrapper::field::{FieldValue, INNER_MODULUS};
use proof_wrapper::srs::{ReferenceString, SrsError, G1_POINT_SIZE, G2_POINT_SIZE};
use proof_wrapper::{
    pack, unpack, ArtifactKind, ArtifactStore, DigestBackend, FileSystemStore, FinalProof,
    InMemoryStore, PackingParams, Pipeline, PipelineConfig, PipelineError, PlonkBackend,
    ProofBundle, SrsProvisioner, SrsSource,
};

/// Serves a synthetic reference string and counts fetches
struct FakeSource {
    /// Fixed size to serve regardless of the request
    fixed: Option<usize>,
    fetches: Rc<Cell<usize>>,
}

impl FakeSource {
    fn new() -> Self {
        Self {
            fixed: None,
            fetches: Rc::new(Cell::new(0)),
        }
    }

    fn undersized(points: usize) -> Self {
        Self {
            fixed: Some(points),
            ..Self::new()
        }
    }
}

impl SrsSource for FakeSource {
    fn fetch(&self, size: usize) -> Result<ReferenceString, SrsError> {
        self.fetches.set(self.fetches.get() + 1);
        let points = self.fixed.unwrap_or(size);
        ReferenceString::from_points(&vec![0x11; points * G1_POINT_SIZE], &[0x22; G2_POINT_SIZE])
    }
}

/// Serves nothing, as when the ceremony host is unreachable
struct FailingSource;

impl SrsSource for FailingSource {
    fn fetch(&self, _size: usize) -> Result<ReferenceString, SrsError> {
        Err(SrsError::Transcript("truncated header".to_string()))
    }
}

/// Rejects every inner proof
struct RejectingVerifier;

impl InnerVerifier for RejectingVerifier {
    fn verify(
        &self,
        _common: &CommonCircuitData,
        _verifier_data: &VerifierOnlyCircuitData,
        _proof: &InnerProof,
        _public_inputs: &[FieldValue],
    ) -> Result<(), String> {
        Err("bad FRI opening".to_string())
    }
}

fn bundle(public_inputs: Vec<u64>, circuit: u64) -> ProofBundle {
    let n = public_inputs.len();
    ProofBundle::from_json_strs(
        &json!({
            "proof": { "wires_cap": [[circuit, 1]], "opening_proof": { "pow_witness": 3 } },
            "public_inputs": public_inputs
        })
        .to_string(),
        &json!({ "num_public_inputs": n, "degree_bits": 12 }).to_string(),
        &json!({ "constants_sigmas_cap": [[circuit]], "circuit_digest": [circuit, 2] }).to_string(),
    )
    .unwrap()
}

fn pipeline_with(
    config: PipelineConfig,
    source: FakeSource,
) -> Pipeline<InMemoryStore, DigestBackend> {
    Pipeline::new(
        config,
        InMemoryStore::new(),
        DigestBackend::new(),
        SrsProvisioner::new(Box::new(source)),
    )
}

fn pipeline() -> Pipeline<InMemoryStore, DigestBackend> {
    pipeline_with(PipelineConfig::default(), FakeSource::new())
}

fn verify_published(store: &impl ArtifactStore, final_proof: &FinalProof) {
    let vk = VerifyingKey::from_bytes(store.load(ArtifactKind::VerifyingKey).unwrap());
    let proof = proof_wrapper::backend::Proof::from_bytes(final_proof.proof_bytes().unwrap());
    let public = PublicWitness(final_proof.compressed_inputs().unwrap());
    DigestBackend::new().verify(&proof, &vk, &public).unwrap();
}

#[test]
fn test_compile_then_prove() {
    let mut pipeline = pipeline();
    pipeline.compile(bundle(vec![1, 2, 3, 4, 5, 6, 7], 1)).unwrap();
    let final_proof = pipeline.prove(bundle(vec![1, 2, 3, 4, 5, 6, 7], 1)).unwrap();

    let first: BigUint = (BigUint::from(1u8) << 160u32)
        + (BigUint::from(2u8) << 128u32)
        + (BigUint::from(3u8) << 96u32)
        + (BigUint::from(4u8) << 64u32)
        + (BigUint::from(5u8) << 32u32)
        + BigUint::from(6u8);
    let second = BigUint::from(7u8) << 160u32;
    assert_eq!(
        final_proof.public_inputs,
        vec![first.to_string(), second.to_string()]
    );
    assert!(final_proof.proof.starts_with("0x"));

    let stored: FinalProof = pipeline.store().load_json(ArtifactKind::FinalProof).unwrap();
    assert_eq!(stored, final_proof);
    verify_published(pipeline.store(), &final_proof);
}

#[test]
fn test_compile_writes_every_artifact() {
    let mut pipeline = pipeline();
    pipeline.compile(bundle(vec![10, 20], 1)).unwrap();

    let store = pipeline.store();
    for kind in [
        ArtifactKind::ConstraintSystem,
        ArtifactKind::ProvingKey,
        ArtifactKind::VerifyingKey,
        ArtifactKind::ReferenceString,
        ArtifactKind::VerifierContract,
        ArtifactKind::Manifest,
    ] {
        assert!(store.contains(kind), "missing {}", kind);
    }
    assert!(!store.contains(ArtifactKind::FinalProof));
}

#[test]
fn test_run_on_file_system() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let store = FileSystemStore::open(&data_dir).unwrap();
    bundle(vec![5, 4, 3, 2, 1, 0, 9, 8], 1).save(&data_dir).unwrap();

    let mut pipeline = Pipeline::new(
        PipelineConfig::default().with_data_dir(&data_dir),
        store,
        DigestBackend::new(),
        SrsProvisioner::new(Box::new(FakeSource::new())),
    );
    let final_proof = pipeline.run(&data_dir, true).unwrap();

    for name in [
        "r1cs",
        "proving.key",
        "verifying.key",
        "srs_setup",
        "verifier.sol",
        "manifest.json",
        "final_proof.json",
    ] {
        assert!(data_dir.join(name).is_file(), "missing {}", name);
    }
    assert_eq!(
        FinalProof::load(&data_dir.join("final_proof.json")).unwrap(),
        final_proof
    );

    // Second run reuses the stored artifacts
    let again = pipeline.run(&data_dir, false).unwrap();
    assert_eq!(again.public_inputs, final_proof.public_inputs);
    verify_published(pipeline.store(), &again);
}

#[test]
fn test_repeated_prove_keeps_public_inputs() {
    let mut pipeline = pipeline();
    pipeline.compile(bundle((100..113).collect(), 1)).unwrap();

    let a = pipeline.prove(bundle((100..113).collect(), 1)).unwrap();
    let b = pipeline.prove(bundle((100..113).collect(), 1)).unwrap();
    assert_eq!(a.public_inputs, b.public_inputs);
    assert_eq!(a.public_inputs.len(), 3);
}

#[test]
fn test_same_circuit_new_values_reuses_artifacts() {
    let mut pipeline = pipeline();
    pipeline.compile(bundle(vec![1, 2, 3], 1)).unwrap();
    let final_proof = pipeline.prove(bundle(vec![7, 8, 9], 1)).unwrap();

    let expected = (BigUint::from(7u8) << 160u32)
        + (BigUint::from(8u8) << 128u32)
        + (BigUint::from(9u8) << 96u32);
    assert_eq!(final_proof.compressed_inputs().unwrap(), vec![expected]);
}

#[test]
fn test_uncompressed_inputs_pass_through() {
    let mut pipeline = pipeline_with(PipelineConfig::uncompressed(), FakeSource::new());
    let values = vec![u64::MAX - 5, 0, 12345];
    pipeline.compile(bundle(values.clone(), 1)).unwrap();
    let final_proof = pipeline.prove(bundle(values.clone(), 1)).unwrap();

    let expected: Vec<String> = values
        .into_iter()
        .map(|v| FieldValue::reduce(v).as_u64().to_string())
        .collect();
    assert_eq!(final_proof.public_inputs, expected);
}

#[test]
fn test_non_canonical_inputs_are_reduced() {
    let mut pipeline = pipeline();
    pipeline.compile(bundle(vec![INNER_MODULUS + 5], 1)).unwrap();
    let final_proof = pipeline.prove(bundle(vec![INNER_MODULUS + 5], 1)).unwrap();
    assert_eq!(
        final_proof.compressed_inputs().unwrap(),
        vec![BigUint::from(5u8) << 160u32]
    );
}

#[test]
fn test_direct_call() {
    let mut pipeline = pipeline();
    let exported = bundle(vec![3, 1, 4, 1, 5], 1).export().unwrap();

    pipeline.compile_bundle(&exported).unwrap();
    assert!(pipeline.store().contains(ArtifactKind::Manifest));

    let final_proof = pipeline.prove_bundle(&exported).unwrap();
    verify_published(pipeline.store(), &final_proof);
}

#[test]
fn test_direct_call_rejects_bad_json() {
    let mut pipeline = pipeline();
    let mut exported = bundle(vec![3, 1, 4], 1).export().unwrap();
    exported.proof_with_public_inputs = "{\"proof\": ".to_string();

    let err = pipeline.compile_bundle(&exported).unwrap_err();
    assert!(matches!(err, PipelineError::MalformedInput(_)));
    for kind in ArtifactKind::ALL {
        assert!(!pipeline.store().contains(kind), "unexpected {}", kind);
    }
}

#[test]
fn test_prove_without_compile_is_missing_artifact() {
    let mut pipeline = pipeline();
    let err = pipeline.prove(bundle(vec![1, 2], 1)).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::MissingArtifact {
            kind: ArtifactKind::ConstraintSystem,
            ..
        }
    ));
}

#[test]
fn test_missing_verifying_key() {
    let mut pipeline = pipeline();
    pipeline.compile(bundle(vec![1, 2], 1)).unwrap();
    pipeline.store_mut().remove(ArtifactKind::VerifyingKey);

    let err = pipeline.prove(bundle(vec![1, 2], 1)).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::MissingArtifact {
            kind: ArtifactKind::VerifyingKey,
            ..
        }
    ));
    assert!(!pipeline.store().contains(ArtifactKind::FinalProof));
}

#[test]
fn test_bundle_for_other_circuit_is_mismatch() {
    let mut pipeline = pipeline();
    pipeline.compile(bundle(vec![1, 2, 3], 1)).unwrap();

    let err = pipeline.prove(bundle(vec![1, 2, 3], 2)).unwrap_err();
    assert!(matches!(err, PipelineError::ArtifactMismatch(_)));
    assert!(!pipeline.store().contains(ArtifactKind::FinalProof));
}

#[test]
fn test_foreign_verifying_key_fails_self_check() {
    let mut other = pipeline();
    other.compile(bundle(vec![1, 2, 3], 2)).unwrap();
    let foreign_vk = other.store().load(ArtifactKind::VerifyingKey).unwrap();

    let mut pipeline = pipeline();
    pipeline.compile(bundle(vec![1, 2, 3], 1)).unwrap();
    // Without a manifest nothing binds the keys together
    pipeline.store_mut().remove(ArtifactKind::Manifest);
    pipeline
        .store_mut()
        .save(ArtifactKind::VerifyingKey, &foreign_vk)
        .unwrap();

    let err = pipeline.prove(bundle(vec![1, 2, 3], 1)).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::SelfCheckFailure(BackendError::Verification(_))
    ));
    assert!(!pipeline.store().contains(ArtifactKind::FinalProof));
}

#[test]
fn test_swapped_verifying_key_caught_by_manifest() {
    let mut other = pipeline();
    other.compile(bundle(vec![1, 2, 3], 2)).unwrap();
    let foreign_vk = other.store().load(ArtifactKind::VerifyingKey).unwrap();

    let mut pipeline = pipeline();
    pipeline.compile(bundle(vec![1, 2, 3], 1)).unwrap();
    pipeline
        .store_mut()
        .save(ArtifactKind::VerifyingKey, &foreign_vk)
        .unwrap();

    let err = pipeline.prove(bundle(vec![1, 2, 3], 1)).unwrap_err();
    assert!(matches!(err, PipelineError::ArtifactMismatch(_)));
}

#[test]
fn test_corrupt_proving_key() {
    let mut pipeline = pipeline();
    pipeline.compile(bundle(vec![1, 2, 3], 1)).unwrap();
    pipeline.store_mut().remove(ArtifactKind::Manifest);
    pipeline
        .store_mut()
        .save(ArtifactKind::ProvingKey, &[1, 2, 3])
        .unwrap();

    let err = pipeline.prove(bundle(vec![1, 2, 3], 1)).unwrap_err();
    assert!(matches!(err, PipelineError::CorruptArtifact { .. }));
}

#[test]
fn test_oversized_input_writes_nothing() {
    let mut pipeline = pipeline();
    let err = pipeline.compile(bundle(vec![1, 1 << 32], 1)).unwrap_err();
    assert!(matches!(err, PipelineError::MalformedInput(_)));

    for kind in ArtifactKind::ALL {
        assert!(!pipeline.store().contains(kind), "unexpected {}", kind);
    }
}

#[test]
fn test_undersized_reference_string_fails_setup() {
    let mut pipeline = pipeline_with(PipelineConfig::default(), FakeSource::undersized(4));
    let err = pipeline.compile(bundle((0..30).collect(), 1)).unwrap_err();

    assert!(matches!(err, PipelineError::Backend(BackendError::Setup(_))));
    assert!(!pipeline.store().contains(ArtifactKind::ConstraintSystem));
    assert!(!pipeline.store().contains(ArtifactKind::ProvingKey));
}

#[test]
fn test_unavailable_reference_string_is_provisioning_error() {
    let mut pipeline = Pipeline::new(
        PipelineConfig::default(),
        InMemoryStore::new(),
        DigestBackend::new(),
        SrsProvisioner::new(Box::new(FailingSource)),
    );
    let err = pipeline.compile(bundle(vec![1, 2, 3], 1)).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Provisioning(SrsError::Transcript(_))
    ));
    for kind in ArtifactKind::ALL {
        assert!(!pipeline.store().contains(kind), "unexpected {}", kind);
    }
}

#[test]
fn test_unreadable_artifact_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemStore::open(dir.path()).unwrap();
    let mut pipeline = Pipeline::new(
        PipelineConfig::default().with_data_dir(dir.path()),
        store,
        DigestBackend::new(),
        SrsProvisioner::new(Box::new(FakeSource::new())),
    );
    pipeline.compile(bundle(vec![1, 2, 3], 1)).unwrap();

    // A directory where the constraint system should be cannot be read
    let r1cs = pipeline.store().path(ArtifactKind::ConstraintSystem);
    std::fs::remove_file(&r1cs).unwrap();
    std::fs::create_dir(&r1cs).unwrap();

    let err = pipeline.prove(bundle(vec![1, 2, 3], 1)).unwrap_err();
    match err {
        PipelineError::Io { context, .. } => {
            assert_eq!(context, ArtifactKind::ConstraintSystem.to_string())
        }
        other => panic!("expected io error, got {:?}", other),
    }
    assert!(!pipeline.store().contains(ArtifactKind::FinalProof));
}

#[test]
fn test_constraint_system_with_unknown_signal_is_corrupt() {
    let mut pipeline = pipeline();
    pipeline.compile(bundle(vec![1, 2, 3], 1)).unwrap();
    pipeline.store_mut().remove(ArtifactKind::Manifest);

    let circuit = CompiledCircuit {
        num_public: 1,
        num_private: 3,
        constraints: vec![Constraint::Linear(
            LinearCombination::signal(Signal::Public(0))
                .add(LinearCombination::signal(Signal::Private(40)).negate()),
        )],
    };
    pipeline
        .store_mut()
        .save(ArtifactKind::ConstraintSystem, &circuit.encode().unwrap())
        .unwrap();

    let err = pipeline.prove(bundle(vec![1, 2, 3], 1)).unwrap_err();
    assert!(matches!(err, PipelineError::CorruptArtifact { .. }));
    assert!(!pipeline.store().contains(ArtifactKind::FinalProof));
}

#[test]
fn test_reference_string_fetched_once() {
    let source = FakeSource::new();
    let fetches = Rc::clone(&source.fetches);
    let mut pipeline = pipeline_with(PipelineConfig::default(), source);

    pipeline.compile(bundle(vec![1, 2], 1)).unwrap();
    pipeline.compile(bundle(vec![1, 2, 3, 4], 1)).unwrap();
    assert_eq!(fetches.get(), 1);
}

#[test]
fn test_rejected_inner_proof_is_not_published() {
    let mut pipeline = Pipeline::new(
        PipelineConfig::default(),
        InMemoryStore::new(),
        DigestBackend::with_inner_verifier(Box::new(RejectingVerifier)),
        SrsProvisioner::new(Box::new(FakeSource::new())),
    );
    pipeline.compile(bundle(vec![1, 2], 1)).unwrap();

    let err = pipeline.prove(bundle(vec![1, 2], 1)).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Backend(BackendError::ConstraintViolation(_))
    ));
    assert!(!pipeline.store().contains(ArtifactKind::FinalProof));
}

proptest! {
    #[test]
    fn prop_compressed_packing_roundtrip(raw in prop::collection::vec(0u64..(1 << 32), 0..40)) {
        let params = PackingParams::COMPRESSED;
        let values: Vec<FieldValue> = raw.iter().copied().map(FieldValue::reduce).collect();
        let packed = pack(&values, params).unwrap();

        prop_assert_eq!(packed.len(), raw.len().div_ceil(params.factor));
        let unpacked: Vec<u64> = packed
            .iter()
            .flat_map(|c| unpack(c, params))
            .take(raw.len())
            .collect();
        prop_assert_eq!(unpacked, raw);
    }

    #[test]
    fn prop_wide_values_are_rejected(
        prefix in prop::collection::vec(0u64..(1 << 32), 0..10),
        wide in (1u64 << 32)..(INNER_MODULUS),
    ) {
        let mut values: Vec<FieldValue> = prefix.iter().copied().map(FieldValue::reduce).collect();
        values.push(FieldValue::reduce(wide));
        prop_assert!(pack(&values, PackingParams::COMPRESSED).is_err());
    }
}
