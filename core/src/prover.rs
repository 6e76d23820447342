//! Prover backend interface and the in-process reference prover

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};

use crate::error::{Result, VeilError};
use crate::types::ClaimType;
use crate::validator::decimal_at_least;
use crate::witness::Witness;
use crate::zk::{Adapter, CircuitId, CircuitRegistry, ProofSystemAdapter};

/// What a backend hands back for one circuit evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProof {
    pub proof_bytes: Vec<u8>,
    pub public_inputs: Vec<String>,
}

/// External circuit evaluator.
///
/// Implementations report transient failures (timeouts, dropped connections)
/// as [`VeilError::ProverBackend`] and unsatisfiable witnesses as
/// [`VeilError::ConstraintViolation`]. Only the former is retried.
#[async_trait]
pub trait ProverBackend: Send + Sync {
    async fn prove(&self, circuit_id: &CircuitId, witness: &Witness) -> Result<BackendProof>;
}

/// Evaluates each claim's relation in process and seals the proof in the
/// circuit's native layout. Not zero-knowledge: it exists so the lifecycle can
/// run without an external prover.
#[derive(Debug, Clone)]
pub struct ReferenceProver {
    registry: Arc<CircuitRegistry>,
}

impl ReferenceProver {
    pub fn new(registry: Arc<CircuitRegistry>) -> Self {
        Self { registry }
    }

    fn check_relation(witness: &Witness) -> Result<()> {
        let satisfied = match witness.claim_type() {
            ClaimType::Balance => {
                match (witness.private_value("actualBalance"), witness.public_value("minBalance")) {
                    (Some(actual), Some(minimum)) => decimal_at_least(actual, minimum) == Some(true),
                    _ => false,
                }
            }
            ClaimType::Identity => {
                match (witness.private_value("dateOfBirth"), witness.public_value("ageOver")) {
                    (Some(dob), Some(age_over)) => {
                        let today = Utc::now().date_naive();
                        match (NaiveDate::parse_from_str(dob, "%Y-%m-%d"), age_over.parse::<i32>()) {
                            (Ok(dob), Ok(age_over)) => age_in_years(dob, today)
                                .map_or(false, |age| age >= age_over),
                            _ => false,
                        }
                    }
                    _ => false,
                }
            }
            // Signature checks belong to the external circuit
            ClaimType::Ownership | ClaimType::Transaction => true,
        };

        if satisfied {
            Ok(())
        } else {
            Err(VeilError::ConstraintViolation)
        }
    }
}

/// Whole years between `dob` and `today`, `None` for a future birth date
fn age_in_years(dob: NaiveDate, today: NaiveDate) -> Option<i32> {
    if dob > today {
        return None;
    }
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    Some(age)
}

#[async_trait]
impl ProverBackend for ReferenceProver {
    async fn prove(&self, circuit_id: &CircuitId, witness: &Witness) -> Result<BackendProof> {
        let circuit = self
            .registry
            .by_id(circuit_id)
            .ok_or_else(|| VeilError::UnknownCircuit(circuit_id.to_string()))?;

        Self::check_relation(witness)?;

        let adapter = Adapter::for_system(circuit.proof_system);
        let proof_bytes = adapter.seal(
            &circuit.verification_key,
            witness.public_inputs(),
            witness.blinding(),
        )?;

        Ok(BackendProof {
            proof_bytes,
            public_inputs: witness.public_inputs().to_vec(),
        })
    }
}
