//! Proof system adapters
//!
//! One adapter per proof system, all behind [`ProofSystemAdapter`]. The set of
//! systems is closed: [`Adapter`] is a plain enum and every dispatch is an
//! exhaustive `match`, so adding a system is a compile-checked change.
//!
//! ## Layouts
//!
//! Each adapter owns its canonical proof and calldata byte layout:
//! - Groth16: three curve points (A in G1, B in G2, C in G1)
//! - PLONK: nine G1 commitments followed by six opening evaluations
//! - STARK: trace and composition Merkle roots, one root per FRI layer,
//!   the final layer value and the query seed
//!
//! ## Soundness
//!
//! These are transcript-bound placeholder proofs, not sound zero-knowledge
//! proofs. [`ProofSystemAdapter::seal`] needs only the verification key, the
//! public inputs and a blinding value, so anyone can produce bytes that
//! [`ProofSystemAdapter::verify`] accepts for any claim without holding a
//! witness. `verify` establishes that the bytes are well formed and bound to
//! that key and those inputs. It does not establish that the claim holds.
//! The claim relation is checked only by the prover backend before it seals.

pub mod circuit;
pub mod groth16;
pub mod plonk;
pub mod stark;
pub mod transcript;

pub use circuit::{Circuit, CircuitId, CircuitRegistry, VerificationKey};
pub use groth16::Groth16Adapter;
pub use plonk::PlonkAdapter;
pub use stark::StarkAdapter;

use crate::error::{Result, VeilError};
use crate::prover::ProverBackend;
use crate::types::{ClaimType, ProofSystem};
use crate::witness::Witness;

/// Uniform capability interface implemented by every proof system
pub trait ProofSystemAdapter {
    fn system(&self) -> ProofSystem;

    /// Canonical verification key bytes for a circuit with `num_inputs`
    /// public inputs
    fn derive_verification_key(&self, claim_type: ClaimType, num_inputs: usize) -> Vec<u8>;

    /// Lay out a proof bound to `key` and `public_inputs`. Used by prover
    /// backends; `blinding` must be fresh per proof. Takes no witness, so the
    /// result attests nothing about the claim (see the module docs).
    fn seal(
        &self,
        key: &VerificationKey,
        public_inputs: &[String],
        blinding: &[u8; 32],
    ) -> Result<Vec<u8>>;

    /// Pure validity check. Malformed bytes are an error, a well-formed proof
    /// that does not bind to the key and inputs is `Ok(false)`. `Ok(true)`
    /// means bound, not sound: any sealed proof passes.
    fn verify(
        &self,
        proof_bytes: &[u8],
        public_inputs: &[String],
        key: &VerificationKey,
    ) -> Result<bool>;

    /// Byte-packed encoding consumed by the on-chain verifier
    fn serialize_calldata(&self, proof_bytes: &[u8], public_inputs: &[String]) -> Result<Vec<u8>>;

    /// Fixed on-chain verification cost, before calldata
    fn base_verification_gas(&self) -> u64;
}

/// Output of a successful generation
#[derive(Debug, Clone)]
pub struct GeneratedProof {
    pub proof_bytes: Vec<u8>,
    pub public_inputs: Vec<String>,
    pub verification_key: VerificationKey,
}

#[derive(Debug, Clone, Copy)]
pub enum Adapter {
    Groth16(Groth16Adapter),
    Plonk(PlonkAdapter),
    Stark(StarkAdapter),
}

impl Adapter {
    pub fn for_system(system: ProofSystem) -> Self {
        match system {
            ProofSystem::Groth16 => Adapter::Groth16(Groth16Adapter),
            ProofSystem::Plonk => Adapter::Plonk(PlonkAdapter),
            ProofSystem::Stark => Adapter::Stark(StarkAdapter),
        }
    }

    /// Delegate proving to the backend and check what comes back
    pub async fn generate(
        &self,
        backend: &dyn ProverBackend,
        circuit: &Circuit,
        witness: &Witness,
    ) -> Result<GeneratedProof> {
        if circuit.proof_system != self.system() {
            return Err(VeilError::UnsupportedProofSystem(format!(
                "{} circuit given to the {} adapter",
                circuit.proof_system,
                self.system()
            )));
        }

        let output = backend.prove(&circuit.id, witness).await?;

        if output.public_inputs != witness.public_inputs() {
            return Err(VeilError::InvalidProofFormat(
                "backend returned public inputs that do not match the claim".into(),
            ));
        }

        let binds = self.verify(
            &output.proof_bytes,
            &output.public_inputs,
            &circuit.verification_key,
        )?;
        if !binds {
            return Err(VeilError::InvalidProofFormat(
                "backend proof does not verify against the circuit key".into(),
            ));
        }

        Ok(GeneratedProof {
            proof_bytes: output.proof_bytes,
            public_inputs: output.public_inputs,
            verification_key: circuit.verification_key.clone(),
        })
    }

    fn inner(&self) -> &dyn ProofSystemAdapter {
        match self {
            Adapter::Groth16(a) => a,
            Adapter::Plonk(a) => a,
            Adapter::Stark(a) => a,
        }
    }
}

impl ProofSystemAdapter for Adapter {
    fn system(&self) -> ProofSystem {
        self.inner().system()
    }

    fn derive_verification_key(&self, claim_type: ClaimType, num_inputs: usize) -> Vec<u8> {
        self.inner().derive_verification_key(claim_type, num_inputs)
    }

    fn seal(
        &self,
        key: &VerificationKey,
        public_inputs: &[String],
        blinding: &[u8; 32],
    ) -> Result<Vec<u8>> {
        self.inner().seal(key, public_inputs, blinding)
    }

    fn verify(
        &self,
        proof_bytes: &[u8],
        public_inputs: &[String],
        key: &VerificationKey,
    ) -> Result<bool> {
        self.inner().verify(proof_bytes, public_inputs, key)
    }

    fn serialize_calldata(&self, proof_bytes: &[u8], public_inputs: &[String]) -> Result<Vec<u8>> {
        self.inner().serialize_calldata(proof_bytes, public_inputs)
    }

    fn base_verification_gas(&self) -> u64 {
        self.inner().base_verification_gas()
    }
}

/// Shared key checks: right system, id still matches the bytes
pub(crate) fn check_key(system: ProofSystem, key: &VerificationKey) -> Result<bool> {
    if key.proof_system != system {
        return Err(VeilError::InvalidProofFormat(format!(
            "{} verification key used with the {} verifier",
            key.proof_system, system
        )));
    }
    Ok(key.is_content_addressed())
}
