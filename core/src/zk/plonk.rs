//! PLONK adapter
//!
//! Proof layout (768 bytes): nine G1 commitments
//! `a, b, c, z, t_lo, t_mid, t_hi, W_ζ, W_ζω` followed by six opening
//! evaluations `ā, b̄, c̄, σ̄1, σ̄2, z̄_ω`.
//!
//! Key layout: `u32 domain size ‖ u32 public input count ‖` eight G1
//! commitments (`q_l, q_r, q_o, q_m, q_c, σ1, σ2, σ3`).

use subtle::ConstantTimeEq;

use super::transcript::{
    is_valid_point, is_valid_scalar, public_input_elements, read_u32, Transcript, FIELD_SIZE,
    G1_SIZE,
};
use super::{check_key, ProofSystemAdapter, VerificationKey};
use crate::error::{Result, VeilError};
use crate::types::{ClaimType, ProofSystem};

const SETUP_DOMAIN: &[u8] = b"veil/plonk/setup/v1";
const PROVE_DOMAIN: &[u8] = b"veil/plonk/prove/v1";

const ROUND_COMMITMENTS: [&str; 7] = ["a", "b", "c", "z", "t_lo", "t_mid", "t_hi"];
const EVALUATIONS: [&str; 6] = ["a_bar", "b_bar", "c_bar", "sigma1_bar", "sigma2_bar", "z_omega_bar"];
const SELECTORS: [&str; 8] = ["q_l", "q_r", "q_o", "q_m", "q_c", "sigma1", "sigma2", "sigma3"];

/// Gates reserved per circuit besides the public inputs
const CIRCUIT_GATES: usize = 1 << 12;

pub const NUM_COMMITMENTS: usize = ROUND_COMMITMENTS.len() + 2;
pub const NUM_EVALUATIONS: usize = EVALUATIONS.len();
pub const PROOF_SIZE: usize = NUM_COMMITMENTS * G1_SIZE + NUM_EVALUATIONS * FIELD_SIZE;

const KEY_SIZE: usize = 8 + SELECTORS.len() * G1_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlonkProof {
    /// Round commitments `a, b, c, z, t_lo, t_mid, t_hi`
    pub commitments: [[u8; G1_SIZE]; 7],
    pub w_zeta: [u8; G1_SIZE],
    pub w_zeta_omega: [u8; G1_SIZE],
    pub evaluations: [[u8; FIELD_SIZE]; NUM_EVALUATIONS],
}

impl PlonkProof {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PROOF_SIZE {
            return Err(VeilError::InvalidProofFormat(format!(
                "plonk proof must be {PROOF_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let mut points = bytes[..NUM_COMMITMENTS * G1_SIZE]
            .chunks_exact(G1_SIZE)
            .map(|chunk| {
                let mut point = [0u8; G1_SIZE];
                point.copy_from_slice(chunk);
                point
            });

        let mut commitments = [[0u8; G1_SIZE]; 7];
        for slot in commitments.iter_mut() {
            *slot = points.next().unwrap_or([0u8; G1_SIZE]);
        }
        let w_zeta = points.next().unwrap_or([0u8; G1_SIZE]);
        let w_zeta_omega = points.next().unwrap_or([0u8; G1_SIZE]);

        let mut evaluations = [[0u8; FIELD_SIZE]; NUM_EVALUATIONS];
        for (slot, chunk) in evaluations
            .iter_mut()
            .zip(bytes[NUM_COMMITMENTS * G1_SIZE..].chunks_exact(FIELD_SIZE))
        {
            slot.copy_from_slice(chunk);
        }

        Ok(Self {
            commitments,
            w_zeta,
            w_zeta_omega,
            evaluations,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PROOF_SIZE);
        for commitment in &self.commitments {
            out.extend_from_slice(commitment);
        }
        out.extend_from_slice(&self.w_zeta);
        out.extend_from_slice(&self.w_zeta_omega);
        for evaluation in &self.evaluations {
            out.extend_from_slice(evaluation);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlonkKey {
    pub domain_size: u32,
    pub num_public_inputs: u32,
    pub selectors: [[u8; G1_SIZE]; 8],
}

impl PlonkKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let malformed = || VeilError::InvalidProofFormat("malformed plonk verification key".into());

        if bytes.len() != KEY_SIZE {
            return Err(malformed());
        }
        let domain_size = read_u32(bytes, 0).ok_or_else(malformed)?;
        let num_public_inputs = read_u32(bytes, 4).ok_or_else(malformed)?;
        if !domain_size.is_power_of_two() || num_public_inputs >= domain_size {
            return Err(malformed());
        }

        let mut selectors = [[0u8; G1_SIZE]; 8];
        for (slot, chunk) in selectors.iter_mut().zip(bytes[8..].chunks_exact(G1_SIZE)) {
            slot.copy_from_slice(chunk);
        }
        Ok(Self {
            domain_size,
            num_public_inputs,
            selectors,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(KEY_SIZE);
        out.extend_from_slice(&self.domain_size.to_be_bytes());
        out.extend_from_slice(&self.num_public_inputs.to_be_bytes());
        for selector in &self.selectors {
            out.extend_from_slice(selector);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlonkAdapter;

impl PlonkAdapter {
    /// Opening proofs for ζ and ζω, recomputed by the verifier
    fn openings(
        key_digest: &[u8; 32],
        inputs: &[[u8; 32]],
        commitments: &[[u8; G1_SIZE]; 7],
        evaluations: &[[u8; FIELD_SIZE]; NUM_EVALUATIONS],
    ) -> ([u8; G1_SIZE], [u8; G1_SIZE]) {
        let mut transcript = Transcript::new(PROVE_DOMAIN);
        transcript
            .append(b"vk", key_digest)
            .append_elements(b"input", inputs);
        for (label, commitment) in ROUND_COMMITMENTS.iter().zip(commitments) {
            transcript.append(label.as_bytes(), commitment);
        }
        let zeta = transcript.challenge(b"zeta");
        transcript.append(b"zeta", &zeta);
        for (label, evaluation) in EVALUATIONS.iter().zip(evaluations) {
            transcript.append(label.as_bytes(), evaluation);
        }
        let v = transcript.challenge(b"v");
        transcript.append(b"v", &v);

        (transcript.g1("W_zeta"), transcript.g1("W_zeta_omega"))
    }
}

impl ProofSystemAdapter for PlonkAdapter {
    fn system(&self) -> ProofSystem {
        ProofSystem::Plonk
    }

    fn derive_verification_key(&self, claim_type: ClaimType, num_inputs: usize) -> Vec<u8> {
        let mut setup = Transcript::new(SETUP_DOMAIN);
        setup.append(b"claim", claim_type.as_str().as_bytes());

        let mut selectors = [[0u8; G1_SIZE]; 8];
        for (slot, label) in selectors.iter_mut().zip(SELECTORS) {
            *slot = setup.g1(label);
        }

        PlonkKey {
            domain_size: (CIRCUIT_GATES + num_inputs).next_power_of_two() as u32,
            num_public_inputs: num_inputs as u32,
            selectors,
        }
        .to_bytes()
    }

    fn seal(
        &self,
        key: &VerificationKey,
        public_inputs: &[String],
        blinding: &[u8; 32],
    ) -> Result<Vec<u8>> {
        check_key(self.system(), key)?;
        let digest = key.digest();

        let mut randomness = Transcript::new(PROVE_DOMAIN);
        randomness.append(b"vk", &digest).append(b"blinding", blinding);

        let mut commitments = [[0u8; G1_SIZE]; 7];
        for (slot, label) in commitments.iter_mut().zip(ROUND_COMMITMENTS) {
            *slot = randomness.g1(label);
        }
        let mut evaluations = [[0u8; FIELD_SIZE]; NUM_EVALUATIONS];
        for (slot, label) in evaluations.iter_mut().zip(EVALUATIONS) {
            *slot = randomness.challenge(label.as_bytes());
        }

        let (w_zeta, w_zeta_omega) = Self::openings(
            &digest,
            &public_input_elements(public_inputs),
            &commitments,
            &evaluations,
        );

        Ok(PlonkProof {
            commitments,
            w_zeta,
            w_zeta_omega,
            evaluations,
        }
        .to_bytes())
    }

    fn verify(
        &self,
        proof_bytes: &[u8],
        public_inputs: &[String],
        key: &VerificationKey,
    ) -> Result<bool> {
        if !check_key(self.system(), key)? {
            return Ok(false);
        }
        let parsed_key = PlonkKey::from_bytes(&key.bytes)?;
        let proof = PlonkProof::from_bytes(proof_bytes)?;

        if public_inputs.len() != parsed_key.num_public_inputs as usize {
            return Err(VeilError::InvalidProofFormat(format!(
                "circuit expects {} public inputs, got {}",
                parsed_key.num_public_inputs,
                public_inputs.len()
            )));
        }

        let points_valid = proof.commitments.iter().all(|p| is_valid_point(p))
            && is_valid_point(&proof.w_zeta)
            && is_valid_point(&proof.w_zeta_omega);
        if !points_valid || !proof.evaluations.iter().all(|e| is_valid_scalar(e)) {
            return Ok(false);
        }

        let (w_zeta, w_zeta_omega) = Self::openings(
            &key.digest(),
            &public_input_elements(public_inputs),
            &proof.commitments,
            &proof.evaluations,
        );
        let zeta_ok = w_zeta[..].ct_eq(&proof.w_zeta[..]);
        let zeta_omega_ok = w_zeta_omega[..].ct_eq(&proof.w_zeta_omega[..]);
        Ok(bool::from(zeta_ok & zeta_omega_ok))
    }

    /// The 24 proof words followed by one word per public input
    fn serialize_calldata(&self, proof_bytes: &[u8], public_inputs: &[String]) -> Result<Vec<u8>> {
        let proof = PlonkProof::from_bytes(proof_bytes)?;
        let inputs = public_input_elements(public_inputs);

        let mut out = proof.to_bytes();
        out.reserve(inputs.len() * FIELD_SIZE);
        for input in &inputs {
            out.extend_from_slice(input);
        }
        Ok(out)
    }

    fn base_verification_gas(&self) -> u64 {
        290_000
    }
}
