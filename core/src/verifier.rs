//! Proof verification
//!
//! Stateless. Expiry is checked first and independently: an expired proof is
//! rejected without looking at its bytes.

use chrono::{DateTime, Utc};

use crate::error::{Result, VeilError};
use crate::types::Proof;
use crate::zk::{Adapter, ProofSystemAdapter};

pub struct ProofVerifier;

impl ProofVerifier {
    pub fn verify_proof(proof: &Proof) -> Result<bool> {
        Self::verify_at(proof, Utc::now())
    }

    pub fn verify_at(proof: &Proof, now: DateTime<Utc>) -> Result<bool> {
        if let Some(expired_at) = proof.expires_at.filter(|_| proof.is_expired_at(now)) {
            return Err(VeilError::ProofExpired {
                id: proof.id,
                expired_at,
            });
        }

        let key = &proof.verification_key;
        if key.proof_system != proof.proof_system || key.claim_type != proof.claim_type {
            return Err(VeilError::InvalidProofFormat(format!(
                "verification key is for a {} {} circuit, proof is {} {}",
                key.proof_system, key.claim_type, proof.proof_system, proof.claim_type
            )));
        }

        let valid = Adapter::for_system(proof.proof_system).verify(
            &proof.proof_bytes,
            &proof.public_inputs,
            key,
        )?;
        tracing::debug!(proof_id = %proof.id, valid, "verified proof");
        Ok(valid)
    }
}
