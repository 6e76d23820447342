//! Groth16 adapter
//!
//! Proof layout (256 bytes): `A (G1) ‖ B (G2) ‖ C (G1)`, coordinates as
//! 32-byte big-endian field elements, G2 coordinates in `(c0, c1)` order.
//!
//! Key layout: `α (G1) ‖ β (G2) ‖ γ (G2) ‖ δ (G2) ‖ u32 IC count ‖ IC[i] (G1)`.
//! The IC vector has one point per public input plus one, as in a snarkjs
//! export.
//!
//! C is drawn from a transcript over the key digest, the public input field
//! elements and A, B. Verification recomputes it, so a proof only checks
//! against the inputs and key it was produced for.

use subtle::ConstantTimeEq;

use super::transcript::{
    is_valid_point, public_input_elements, read_u32, Transcript, FIELD_SIZE, G1_SIZE, G2_SIZE,
};
use super::{check_key, ProofSystemAdapter, VerificationKey};
use crate::error::{Result, VeilError};
use crate::types::{ClaimType, ProofSystem};

const SETUP_DOMAIN: &[u8] = b"veil/groth16/setup/v1";
const PROVE_DOMAIN: &[u8] = b"veil/groth16/prove/v1";

/// Size of a serialized proof
pub const PROOF_SIZE: usize = G1_SIZE + G2_SIZE + G1_SIZE;

const KEY_HEADER_SIZE: usize = G1_SIZE + 3 * G2_SIZE + 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Groth16Proof {
    pub a: [u8; G1_SIZE],
    pub b: [u8; G2_SIZE],
    pub c: [u8; G1_SIZE],
}

impl Groth16Proof {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PROOF_SIZE {
            return Err(VeilError::InvalidProofFormat(format!(
                "groth16 proof must be {PROOF_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let mut proof = Self {
            a: [0u8; G1_SIZE],
            b: [0u8; G2_SIZE],
            c: [0u8; G1_SIZE],
        };
        proof.a.copy_from_slice(&bytes[..G1_SIZE]);
        proof.b.copy_from_slice(&bytes[G1_SIZE..G1_SIZE + G2_SIZE]);
        proof.c.copy_from_slice(&bytes[G1_SIZE + G2_SIZE..]);
        Ok(proof)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PROOF_SIZE);
        out.extend_from_slice(&self.a);
        out.extend_from_slice(&self.b);
        out.extend_from_slice(&self.c);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Groth16Key {
    pub alpha: [u8; G1_SIZE],
    pub beta: [u8; G2_SIZE],
    pub gamma: [u8; G2_SIZE],
    pub delta: [u8; G2_SIZE],
    pub ic: Vec<[u8; G1_SIZE]>,
}

impl Groth16Key {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let malformed = || VeilError::InvalidProofFormat("malformed groth16 verification key".into());

        if bytes.len() < KEY_HEADER_SIZE {
            return Err(malformed());
        }
        let ic_count = read_u32(bytes, G1_SIZE + 3 * G2_SIZE).ok_or_else(malformed)? as usize;
        if ic_count == 0 || bytes.len() != KEY_HEADER_SIZE + ic_count * G1_SIZE {
            return Err(malformed());
        }

        let mut key = Self {
            alpha: [0u8; G1_SIZE],
            beta: [0u8; G2_SIZE],
            gamma: [0u8; G2_SIZE],
            delta: [0u8; G2_SIZE],
            ic: Vec::with_capacity(ic_count),
        };
        let mut offset = 0;
        key.alpha.copy_from_slice(&bytes[offset..offset + G1_SIZE]);
        offset += G1_SIZE;
        key.beta.copy_from_slice(&bytes[offset..offset + G2_SIZE]);
        offset += G2_SIZE;
        key.gamma.copy_from_slice(&bytes[offset..offset + G2_SIZE]);
        offset += G2_SIZE;
        key.delta.copy_from_slice(&bytes[offset..offset + G2_SIZE]);
        offset += G2_SIZE + 4;

        for chunk in bytes[offset..].chunks_exact(G1_SIZE) {
            let mut point = [0u8; G1_SIZE];
            point.copy_from_slice(chunk);
            key.ic.push(point);
        }
        Ok(key)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(KEY_HEADER_SIZE + self.ic.len() * G1_SIZE);
        out.extend_from_slice(&self.alpha);
        out.extend_from_slice(&self.beta);
        out.extend_from_slice(&self.gamma);
        out.extend_from_slice(&self.delta);
        out.extend_from_slice(&(self.ic.len() as u32).to_be_bytes());
        for point in &self.ic {
            out.extend_from_slice(point);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Groth16Adapter;

impl Groth16Adapter {
    fn bind_c(
        key_digest: &[u8; 32],
        inputs: &[[u8; 32]],
        a: &[u8; G1_SIZE],
        b: &[u8; G2_SIZE],
    ) -> [u8; G1_SIZE] {
        let mut transcript = Transcript::new(PROVE_DOMAIN);
        transcript
            .append(b"vk", key_digest)
            .append_elements(b"input", inputs)
            .append(b"A", a)
            .append(b"B", b);
        transcript.g1("C")
    }
}

impl ProofSystemAdapter for Groth16Adapter {
    fn system(&self) -> ProofSystem {
        ProofSystem::Groth16
    }

    fn derive_verification_key(&self, claim_type: ClaimType, num_inputs: usize) -> Vec<u8> {
        let mut setup = Transcript::new(SETUP_DOMAIN);
        setup.append(b"claim", claim_type.as_str().as_bytes());

        Groth16Key {
            alpha: setup.g1("alpha"),
            beta: setup.g2("beta"),
            gamma: setup.g2("gamma"),
            delta: setup.g2("delta"),
            ic: (0..=num_inputs).map(|i| setup.g1(&format!("ic/{i}"))).collect(),
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
        let a = randomness.g1("A");
        let b = randomness.g2("B");
        let c = Self::bind_c(&digest, &public_input_elements(public_inputs), &a, &b);

        Ok(Groth16Proof { a, b, c }.to_bytes())
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
        let parsed_key = Groth16Key::from_bytes(&key.bytes)?;
        let proof = Groth16Proof::from_bytes(proof_bytes)?;

        if public_inputs.len() + 1 != parsed_key.ic.len() {
            return Err(VeilError::InvalidProofFormat(format!(
                "circuit expects {} public inputs, got {}",
                parsed_key.ic.len() - 1,
                public_inputs.len()
            )));
        }

        if !is_valid_point(&proof.a) || !is_valid_point(&proof.b) || !is_valid_point(&proof.c) {
            return Ok(false);
        }

        let expected_c = Self::bind_c(
            &key.digest(),
            &public_input_elements(public_inputs),
            &proof.a,
            &proof.b,
        );
        Ok(bool::from(expected_c[..].ct_eq(&proof.c[..])))
    }

    /// `a[2] ‖ b[2][2] ‖ c[2] ‖ inputs[n]`, 32-byte words. Each G2 coordinate
    /// is emitted as `(c1, c0)`, the order the pairing precompile expects.
    fn serialize_calldata(&self, proof_bytes: &[u8], public_inputs: &[String]) -> Result<Vec<u8>> {
        let proof = Groth16Proof::from_bytes(proof_bytes)?;
        let inputs = public_input_elements(public_inputs);

        let mut out = Vec::with_capacity(PROOF_SIZE + inputs.len() * FIELD_SIZE);
        out.extend_from_slice(&proof.a);
        for coordinate in proof.b.chunks_exact(2 * FIELD_SIZE) {
            out.extend_from_slice(&coordinate[FIELD_SIZE..]);
            out.extend_from_slice(&coordinate[..FIELD_SIZE]);
        }
        out.extend_from_slice(&proof.c);
        for input in &inputs {
            out.extend_from_slice(input);
        }
        Ok(out)
    }

    fn base_verification_gas(&self) -> u64 {
        195_000
    }
}
