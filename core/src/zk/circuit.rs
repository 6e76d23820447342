//! Verification keys and the circuit registry
//!
//! A verification key is derived once per (claim type, proof system) and then
//! frozen. Its circuit id is the SHA-256 of the key bytes, so the same key
//! always carries the same id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::encoding::hex_bytes;
use crate::types::{ClaimType, ProofSystem};
use crate::zk::{Adapter, ProofSystemAdapter};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircuitId(String);

impl CircuitId {
    pub fn from_key_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationKey {
    pub circuit_id: CircuitId,
    pub proof_system: ProofSystem,
    pub claim_type: ClaimType,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl VerificationKey {
    pub fn new(proof_system: ProofSystem, claim_type: ClaimType, bytes: Vec<u8>) -> Self {
        Self {
            circuit_id: CircuitId::from_key_bytes(&bytes),
            proof_system,
            claim_type,
            bytes,
        }
    }

    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(&self.bytes).into()
    }

    /// The id still matches the key bytes
    pub fn is_content_addressed(&self) -> bool {
        self.circuit_id == CircuitId::from_key_bytes(&self.bytes)
    }
}

#[derive(Debug)]
pub struct Circuit {
    pub id: CircuitId,
    pub claim_type: ClaimType,
    pub proof_system: ProofSystem,
    pub verification_key: VerificationKey,
}

/// Lazily populated, append-only map of circuits
#[derive(Debug, Default)]
pub struct CircuitRegistry {
    by_kind: RwLock<HashMap<(ClaimType, ProofSystem), Arc<Circuit>>>,
    by_id: RwLock<HashMap<CircuitId, Arc<Circuit>>>,
}

impl CircuitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the circuit for a pair, deriving its key on first use
    pub fn circuit(&self, claim_type: ClaimType, proof_system: ProofSystem) -> Arc<Circuit> {
        if let Some(circuit) = self.by_kind.read().get(&(claim_type, proof_system)) {
            return Arc::clone(circuit);
        }

        let mut by_kind = self.by_kind.write();
        let circuit = by_kind
            .entry((claim_type, proof_system))
            .or_insert_with(|| {
                let num_inputs = claim_type.claim_fields().len();
                let bytes = Adapter::for_system(proof_system)
                    .derive_verification_key(claim_type, num_inputs);
                let verification_key = VerificationKey::new(proof_system, claim_type, bytes);
                tracing::debug!(
                    claim_type = %claim_type,
                    proof_system = %proof_system,
                    circuit_id = %verification_key.circuit_id,
                    "derived verification key"
                );
                Arc::new(Circuit {
                    id: verification_key.circuit_id.clone(),
                    claim_type,
                    proof_system,
                    verification_key,
                })
            })
            .clone();
        drop(by_kind);

        self.by_id
            .write()
            .entry(circuit.id.clone())
            .or_insert_with(|| Arc::clone(&circuit));
        circuit
    }

    pub fn by_id(&self, id: &CircuitId) -> Option<Arc<Circuit>> {
        self.by_id.read().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_stable_and_content_addressed() {
        let registry = CircuitRegistry::new();
        let first = registry.circuit(ClaimType::Balance, ProofSystem::Groth16);
        let second = registry.circuit(ClaimType::Balance, ProofSystem::Groth16);

        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.verification_key.is_content_addressed());
        assert_eq!(first.id, first.verification_key.circuit_id);

        // A fresh registry derives the identical key
        let other = CircuitRegistry::new().circuit(ClaimType::Balance, ProofSystem::Groth16);
        assert_eq!(other.verification_key, first.verification_key);
    }

    #[test]
    fn test_keys_differ_per_pair() {
        let registry = CircuitRegistry::new();
        let mut ids = std::collections::HashSet::new();
        for claim_type in ClaimType::ALL {
            for system in ProofSystem::ALL {
                ids.insert(registry.circuit(claim_type, system).id.clone());
            }
        }
        assert_eq!(ids.len(), 12);
    }

    #[test]
    fn test_lookup_by_id() {
        let registry = CircuitRegistry::new();
        let circuit = registry.circuit(ClaimType::Identity, ProofSystem::Stark);
        let found = registry.by_id(&circuit.id).unwrap();
        assert_eq!(found.claim_type, ClaimType::Identity);
        assert!(registry
            .by_id(&CircuitId::from_key_bytes(b"nothing"))
            .is_none());
    }

    #[test]
    fn test_tampered_key_is_not_content_addressed() {
        let registry = CircuitRegistry::new();
        let mut key = registry
            .circuit(ClaimType::Ownership, ProofSystem::Plonk)
            .verification_key
            .clone();
        key.bytes[10] ^= 0x01;
        assert!(!key.is_content_addressed());
    }
}
