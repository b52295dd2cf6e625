//! Constraint recording for the digest backend
//!
//! Signals are combined linearly over the outer field. The circuit only ever
//! multiplies a signal by a constant weight, so products of two signals are
//! rejected at compile time.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, BackendResult};
use crate::bundle::{CommonCircuitData, VerifierOnlyCircuitData};
use crate::circuit::{CircuitBuilder, InnerVerifier, SignalLayout, Witness};
use crate::digest::{keccak256, Digest};
use crate::field::outer_modulus;

/// Points a setup needs on top of one per gate
const SETUP_OVERHEAD_POINTS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    Public(usize),
    Private(usize),
}

/// `constant + Σ coeff·signal` with every coefficient reduced and non-zero
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearCombination {
    terms: BTreeMap<Signal, BigUint>,
    constant: BigUint,
}

fn is_zero(value: &BigUint) -> bool {
    value.bits() == 0
}

impl LinearCombination {
    pub fn signal(signal: Signal) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(signal, BigUint::from(1u8));
        Self {
            terms,
            constant: BigUint::default(),
        }
    }

    pub fn constant(value: BigUint) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value % outer_modulus(),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn add(mut self, other: Self) -> Self {
        let r = outer_modulus();
        for (signal, coeff) in other.terms {
            let entry = self.terms.entry(signal).or_default();
            *entry = (&*entry + coeff) % r;
        }
        self.terms.retain(|_, coeff| !is_zero(coeff));
        self.constant = (self.constant + other.constant) % r;
        self
    }

    pub fn scale(mut self, factor: &BigUint) -> Self {
        let r = outer_modulus();
        let factor = factor % r;
        if is_zero(&factor) {
            return Self::default();
        }
        for coeff in self.terms.values_mut() {
            *coeff = (&*coeff * &factor) % r;
        }
        self.constant = (&self.constant * &factor) % r;
        self
    }

    pub fn negate(self) -> Self {
        let minus_one = outer_modulus() - BigUint::from(1u8);
        self.scale(&minus_one)
    }

    pub fn evaluate<F>(&self, assignment: F) -> BigUint
    where
        F: Fn(Signal) -> BigUint,
    {
        let r = outer_modulus();
        self.terms
            .iter()
            .fold(self.constant.clone(), |acc, (signal, coeff)| {
                (acc + coeff * assignment(*signal)) % r
            })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    /// The combination evaluates to zero
    Linear(LinearCombination),
    /// The private inputs are the public inputs of an inner proof for the
    /// pinned inner circuit
    InnerProof {
        /// Common circuit data as JSON
        common_data: String,
        verifier_digest: Digest,
    },
}

/// Constraint system produced by [`ConstraintRecorder`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledCircuit {
    pub num_public: usize,
    pub num_private: usize,
    pub constraints: Vec<Constraint>,
}

impl CompiledCircuit {
    pub fn encode(&self) -> BackendResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| BackendError::Compile(e.to_string()))
    }

    /// Decode a stored constraint system and check every signal it references
    pub fn decode(bytes: &[u8]) -> BackendResult<Self> {
        let circuit: Self = bincode::deserialize(bytes).map_err(|e| corrupt(e.to_string()))?;
        circuit.check_signals()?;
        Ok(circuit)
    }

    fn check_signals(&self) -> BackendResult<()> {
        let linear = self.constraints.iter().filter_map(|c| match c {
            Constraint::Linear(lc) => Some(lc),
            Constraint::InnerProof { .. } => None,
        });
        for lc in linear {
            for signal in lc.terms.keys() {
                let in_range = match *signal {
                    Signal::Public(i) => i < self.num_public,
                    Signal::Private(i) => i < self.num_private,
                };
                if !in_range {
                    return Err(corrupt(format!(
                        "{:?} is outside {} public and {} private signals",
                        signal, self.num_public, self.num_private
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn gate_count(&self) -> usize {
        self.constraints
            .iter()
            .map(|c| match c {
                Constraint::Linear(lc) => lc.num_terms().max(1),
                Constraint::InnerProof { .. } => 1,
            })
            .sum()
    }

    /// Reference string points needed to set this circuit up
    pub fn required_srs_points(&self) -> usize {
        self.gate_count() + SETUP_OVERHEAD_POINTS
    }

    /// Check `witness` against every constraint
    pub fn check(&self, witness: &Witness, inner: &dyn InnerVerifier) -> BackendResult<()> {
        if witness.public.len() != self.num_public || witness.private.len() != self.num_private {
            return Err(BackendError::ConstraintViolation(format!(
                "witness has {} public and {} private values, circuit expects {} and {}",
                witness.public.len(),
                witness.private.len(),
                self.num_public,
                self.num_private
            )));
        }

        let r = outer_modulus();
        if let Some(i) = witness.public.iter().position(|v| v >= r) {
            return Err(BackendError::ConstraintViolation(format!(
                "public value {} is not an outer field element",
                i
            )));
        }

        let assignment = |signal: Signal| match signal {
            Signal::Public(i) => witness.public[i].clone(),
            Signal::Private(i) => BigUint::from(witness.private[i].as_u64()),
        };

        for (i, constraint) in self.constraints.iter().enumerate() {
            match constraint {
                Constraint::Linear(lc) => {
                    if !is_zero(&lc.evaluate(&assignment)) {
                        return Err(BackendError::ConstraintViolation(format!(
                            "constraint {} is not satisfied",
                            i
                        )));
                    }
                }
                Constraint::InnerProof {
                    common_data,
                    verifier_digest,
                } => {
                    let common: CommonCircuitData =
                        serde_json::from_str(common_data).map_err(|e| corrupt(e.to_string()))?;
                    if verifier_data_digest(&witness.verifier_data)? != *verifier_digest {
                        return Err(BackendError::ConstraintViolation(
                            "verifier data does not match the compiled inner circuit".to_string(),
                        ));
                    }
                    inner
                        .verify(
                            &common,
                            &witness.verifier_data,
                            &witness.proof,
                            &witness.private,
                        )
                        .map_err(|e| {
                            BackendError::ConstraintViolation(format!("inner proof: {}", e))
                        })?;
                }
            }
        }
        Ok(())
    }
}

fn corrupt(reason: String) -> BackendError {
    BackendError::Corrupt {
        artifact: "constraint system",
        reason,
    }
}

fn verifier_data_digest(verifier_data: &VerifierOnlyCircuitData) -> BackendResult<Digest> {
    let bytes =
        serde_json::to_vec(verifier_data).map_err(|e| BackendError::Compile(e.to_string()))?;
    Ok(keccak256([bytes.as_slice()]))
}

/// [`CircuitBuilder`] that records constraints instead of evaluating them
pub struct ConstraintRecorder {
    layout: SignalLayout,
    constraints: Vec<Constraint>,
    errors: Vec<String>,
}

impl ConstraintRecorder {
    pub fn new(layout: SignalLayout) -> Self {
        Self {
            layout,
            constraints: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Finish recording; fails if the definition used an unsupported operation
    pub fn finish(self) -> BackendResult<CompiledCircuit> {
        if !self.errors.is_empty() {
            return Err(BackendError::Compile(self.errors.join("; ")));
        }
        Ok(CompiledCircuit {
            num_public: self.layout.num_public,
            num_private: self.layout.num_private,
            constraints: self.constraints,
        })
    }
}

impl CircuitBuilder for ConstraintRecorder {
    type Var = LinearCombination;

    fn public_input(&mut self, index: usize) -> LinearCombination {
        if index >= self.layout.num_public {
            self.errors
                .push(format!("public signal {} out of range", index));
        }
        LinearCombination::signal(Signal::Public(index))
    }

    fn private_input(&mut self, index: usize) -> LinearCombination {
        if index >= self.layout.num_private {
            self.errors
                .push(format!("private signal {} out of range", index));
        }
        LinearCombination::signal(Signal::Private(index))
    }

    fn constant(&mut self, value: BigUint) -> LinearCombination {
        LinearCombination::constant(value)
    }

    fn add(&mut self, a: LinearCombination, b: LinearCombination) -> LinearCombination {
        a.add(b)
    }

    fn mul(&mut self, a: LinearCombination, b: LinearCombination) -> LinearCombination {
        if a.is_constant() {
            b.scale(&a.constant)
        } else if b.is_constant() {
            a.scale(&b.constant)
        } else {
            self.errors
                .push("product of two signals is not supported".to_string());
            LinearCombination::default()
        }
    }

    fn assert_eq(&mut self, a: LinearCombination, b: LinearCombination) {
        self.constraints
            .push(Constraint::Linear(a.add(b.negate())));
    }

    fn verify_inner_proof(
        &mut self,
        common: &CommonCircuitData,
        verifier_data: &VerifierOnlyCircuitData,
    ) {
        let common_data = match serde_json::to_string(common) {
            Ok(json) => json,
            Err(e) => {
                self.errors.push(e.to_string());
                return;
            }
        };
        match verifier_data_digest(verifier_data) {
            Ok(verifier_digest) => self.constraints.push(Constraint::InnerProof {
                common_data,
                verifier_digest,
            }),
            Err(e) => self.errors.push(e.to_string()),
        }
    }
}
