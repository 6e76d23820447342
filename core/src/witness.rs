//! Private witness assembly
//!
//! A [`Witness`] lives only for the duration of one generation call. All
//! private assignments and the per-proof blinding are wiped when it drops,
//! on success and on every error path alike.

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Result, VeilError};
use crate::types::ClaimType;
use crate::validator::ValidatedRequest;
use crate::zk::{Circuit, CircuitId};

const WITNESS_DOMAIN: &[u8] = b"veil/witness/v1";

pub struct Witness {
    circuit_id: CircuitId,
    claim_type: ClaimType,
    public_inputs: Vec<String>,
    assignments: BTreeMap<String, Zeroizing<String>>,
    blinding: Zeroizing<[u8; 32]>,
}

impl Witness {
    pub fn circuit_id(&self) -> &CircuitId {
        &self.circuit_id
    }

    pub fn claim_type(&self) -> ClaimType {
        self.claim_type
    }

    pub fn public_inputs(&self) -> &[String] {
        &self.public_inputs
    }

    /// Public input by claim field name
    pub fn public_value(&self, field: &str) -> Option<&str> {
        let index = self
            .claim_type
            .claim_fields()
            .iter()
            .position(|name| *name == field)?;
        self.public_inputs.get(index).map(String::as_str)
    }

    pub fn private_value(&self, field: &str) -> Option<&str> {
        self.assignments.get(field).map(|value| value.as_str())
    }

    pub fn num_assignments(&self) -> usize {
        self.assignments.len()
    }

    /// Fresh randomness for this proof only
    pub fn blinding(&self) -> &[u8; 32] {
        &self.blinding
    }

    /// Hash commitment to the full assignment. Never stored.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(WITNESS_DOMAIN);
        hasher.update(self.circuit_id.as_str().as_bytes());
        for value in &self.public_inputs {
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        }
        for (name, value) in &self.assignments {
            hasher.update((name.len() as u64).to_be_bytes());
            hasher.update(name.as_bytes());
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        }
        hasher.update(self.blinding.as_slice());
        hasher.finalize().into()
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("circuit_id", &self.circuit_id)
            .field("assignments", &self.assignments.len())
            .finish_non_exhaustive()
    }
}

pub struct WitnessBuilder;

impl WitnessBuilder {
    pub fn build(request: &ValidatedRequest, circuit: &Circuit) -> Result<Witness> {
        if circuit.claim_type != request.claim_type() {
            return Err(VeilError::UnknownCircuit(format!(
                "circuit {} proves {} claims, request is {}",
                circuit.id,
                circuit.claim_type,
                request.claim_type()
            )));
        }

        let assignments = request
            .private_inputs()
            .map(|(name, value)| (name.to_string(), Zeroizing::new(value.to_string())))
            .collect();

        let mut blinding = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(blinding.as_mut());

        Ok(Witness {
            circuit_id: circuit.id.clone(),
            claim_type: request.claim_type(),
            public_inputs: request.public_inputs(),
            assignments,
            blinding,
        })
    }
}
