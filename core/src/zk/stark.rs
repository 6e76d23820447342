//! STARK adapter
//!
//! Proof layout: `u32 FRI layer count ‖ trace root ‖ composition root ‖`
//! one Merkle root per FRI layer `‖ final layer value ‖ u32 query count ‖
//! query seed`. Every root and value is 32 bytes.
//!
//! Key layout: `u32 trace width ‖ u32 log2 trace length ‖ u32 blowup ‖
//! u32 FRI layers ‖ u32 queries ‖ u32 public input count ‖ AIR digest (32)`.

use subtle::ConstantTimeEq;

use super::transcript::{public_input_elements, read_u32, word, Transcript, FIELD_SIZE};
use super::{check_key, ProofSystemAdapter, VerificationKey};
use crate::error::{Result, VeilError};
use crate::types::{ClaimType, ProofSystem};

const SETUP_DOMAIN: &[u8] = b"veil/stark/setup/v1";
const PROVE_DOMAIN: &[u8] = b"veil/stark/prove/v1";

const TRACE_WIDTH: u32 = 8;
const LOG_TRACE_LENGTH: u32 = 12;
const BLOWUP_FACTOR: u32 = 8;
const FRI_LAYERS: u32 = 6;
const NUM_QUERIES: u32 = 30;

const KEY_SIZE: usize = 6 * 4 + 32;

/// Proof size for a given number of FRI layers
pub const fn proof_size(layers: usize) -> usize {
    4 + 2 * FIELD_SIZE + layers * FIELD_SIZE + FIELD_SIZE + 4 + FIELD_SIZE
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarkProof {
    pub trace_root: [u8; 32],
    pub composition_root: [u8; 32],
    pub fri_roots: Vec<[u8; 32]>,
    pub final_value: [u8; 32],
    pub num_queries: u32,
    pub query_seed: [u8; 32],
}

fn array32(bytes: &[u8], offset: usize) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes[offset..offset + 32]);
    out
}

impl StarkProof {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let layers = read_u32(bytes, 0).ok_or_else(|| {
            VeilError::InvalidProofFormat("stark proof is missing its layer count".into())
        })? as usize;
        if layers > 64 || bytes.len() != proof_size(layers) {
            return Err(VeilError::InvalidProofFormat(format!(
                "stark proof with {layers} FRI layers has the wrong length ({} bytes)",
                bytes.len()
            )));
        }

        let mut offset = 4;
        let trace_root = array32(bytes, offset);
        offset += 32;
        let composition_root = array32(bytes, offset);
        offset += 32;
        let mut fri_roots = Vec::with_capacity(layers);
        for _ in 0..layers {
            fri_roots.push(array32(bytes, offset));
            offset += 32;
        }
        let final_value = array32(bytes, offset);
        offset += 32;
        let num_queries = read_u32(bytes, offset)
            .ok_or_else(|| VeilError::InvalidProofFormat("truncated stark proof".into()))?;
        offset += 4;
        let query_seed = array32(bytes, offset);

        Ok(Self {
            trace_root,
            composition_root,
            fri_roots,
            final_value,
            num_queries,
            query_seed,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(proof_size(self.fri_roots.len()));
        out.extend_from_slice(&(self.fri_roots.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.trace_root);
        out.extend_from_slice(&self.composition_root);
        for root in &self.fri_roots {
            out.extend_from_slice(root);
        }
        out.extend_from_slice(&self.final_value);
        out.extend_from_slice(&self.num_queries.to_be_bytes());
        out.extend_from_slice(&self.query_seed);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarkKey {
    pub trace_width: u32,
    pub log_trace_length: u32,
    pub blowup_factor: u32,
    pub fri_layers: u32,
    pub num_queries: u32,
    pub num_public_inputs: u32,
    pub air_digest: [u8; 32],
}

impl StarkKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let malformed = || VeilError::InvalidProofFormat("malformed stark verification key".into());
        if bytes.len() != KEY_SIZE {
            return Err(malformed());
        }
        let field = |i: usize| read_u32(bytes, i * 4).ok_or_else(malformed);

        let key = Self {
            trace_width: field(0)?,
            log_trace_length: field(1)?,
            blowup_factor: field(2)?,
            fri_layers: field(3)?,
            num_queries: field(4)?,
            num_public_inputs: field(5)?,
            air_digest: array32(bytes, 24),
        };
        if key.fri_layers == 0 || key.fri_layers > 64 || !key.blowup_factor.is_power_of_two() {
            return Err(malformed());
        }
        Ok(key)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(KEY_SIZE);
        for value in [
            self.trace_width,
            self.log_trace_length,
            self.blowup_factor,
            self.fri_layers,
            self.num_queries,
            self.num_public_inputs,
        ] {
            out.extend_from_slice(&value.to_be_bytes());
        }
        out.extend_from_slice(&self.air_digest);
        out
    }
}

/// Commitment chain derived from the trace and composition roots
struct FriChain {
    roots: Vec<[u8; 32]>,
    final_value: [u8; 32],
    query_seed: [u8; 32],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StarkAdapter;

impl StarkAdapter {
    fn fri_chain(
        key_digest: &[u8; 32],
        inputs: &[[u8; 32]],
        trace_root: &[u8; 32],
        composition_root: &[u8; 32],
        layers: u32,
        queries: u32,
    ) -> FriChain {
        let mut transcript = Transcript::new(PROVE_DOMAIN);
        transcript
            .append(b"vk", key_digest)
            .append_elements(b"input", inputs)
            .append(b"trace", trace_root)
            .append(b"composition", composition_root);

        let mut roots = Vec::with_capacity(layers as usize);
        for layer in 0..layers {
            let label = format!("fri/{layer}");
            let root = transcript.challenge(label.as_bytes());
            transcript.append(label.as_bytes(), &root);
            roots.push(root);
        }
        let final_value = transcript.challenge(b"final");
        transcript
            .append(b"final", &final_value)
            .append(b"queries", &queries.to_be_bytes());

        FriChain {
            roots,
            final_value,
            query_seed: transcript.challenge(b"query_seed"),
        }
    }
}

impl ProofSystemAdapter for StarkAdapter {
    fn system(&self) -> ProofSystem {
        ProofSystem::Stark
    }

    fn derive_verification_key(&self, claim_type: ClaimType, num_inputs: usize) -> Vec<u8> {
        let mut setup = Transcript::new(SETUP_DOMAIN);
        setup.append(b"claim", claim_type.as_str().as_bytes());

        StarkKey {
            trace_width: TRACE_WIDTH,
            log_trace_length: LOG_TRACE_LENGTH,
            blowup_factor: BLOWUP_FACTOR,
            fri_layers: FRI_LAYERS,
            num_queries: NUM_QUERIES,
            num_public_inputs: num_inputs as u32,
            air_digest: setup.challenge(b"air"),
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
        let parsed_key = StarkKey::from_bytes(&key.bytes)?;
        let digest = key.digest();

        let mut randomness = Transcript::new(PROVE_DOMAIN);
        randomness.append(b"vk", &digest).append(b"blinding", blinding);
        let trace_root = randomness.challenge(b"trace");
        let composition_root = randomness.challenge(b"composition");

        let chain = Self::fri_chain(
            &digest,
            &public_input_elements(public_inputs),
            &trace_root,
            &composition_root,
            parsed_key.fri_layers,
            parsed_key.num_queries,
        );

        Ok(StarkProof {
            trace_root,
            composition_root,
            fri_roots: chain.roots,
            final_value: chain.final_value,
            num_queries: parsed_key.num_queries,
            query_seed: chain.query_seed,
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
        let parsed_key = StarkKey::from_bytes(&key.bytes)?;
        let proof = StarkProof::from_bytes(proof_bytes)?;

        if public_inputs.len() != parsed_key.num_public_inputs as usize {
            return Err(VeilError::InvalidProofFormat(format!(
                "circuit expects {} public inputs, got {}",
                parsed_key.num_public_inputs,
                public_inputs.len()
            )));
        }
        if proof.fri_roots.len() != parsed_key.fri_layers as usize {
            return Err(VeilError::InvalidProofFormat(format!(
                "circuit expects {} FRI layers, got {}",
                parsed_key.fri_layers,
                proof.fri_roots.len()
            )));
        }
        if proof.num_queries != parsed_key.num_queries {
            return Ok(false);
        }

        let chain = Self::fri_chain(
            &key.digest(),
            &public_input_elements(public_inputs),
            &proof.trace_root,
            &proof.composition_root,
            parsed_key.fri_layers,
            parsed_key.num_queries,
        );

        let mut ok = chain.final_value[..].ct_eq(&proof.final_value[..])
            & chain.query_seed[..].ct_eq(&proof.query_seed[..]);
        for (expected, actual) in chain.roots.iter().zip(&proof.fri_roots) {
            ok &= expected[..].ct_eq(&actual[..]);
        }
        Ok(bool::from(ok))
    }

    /// `n ‖ inputs[n] ‖ layers ‖ trace root ‖ composition root ‖ FRI roots ‖
    /// final value ‖ queries ‖ seed`, 32-byte words
    fn serialize_calldata(&self, proof_bytes: &[u8], public_inputs: &[String]) -> Result<Vec<u8>> {
        let proof = StarkProof::from_bytes(proof_bytes)?;
        let inputs = public_input_elements(public_inputs);

        let words = 1 + inputs.len() + 1 + 2 + proof.fri_roots.len() + 1 + 1 + 1;
        let mut out = Vec::with_capacity(words * FIELD_SIZE);
        out.extend_from_slice(&word(inputs.len() as u64));
        for input in &inputs {
            out.extend_from_slice(input);
        }
        out.extend_from_slice(&word(proof.fri_roots.len() as u64));
        out.extend_from_slice(&proof.trace_root);
        out.extend_from_slice(&proof.composition_root);
        for root in &proof.fri_roots {
            out.extend_from_slice(root);
        }
        out.extend_from_slice(&proof.final_value);
        out.extend_from_slice(&word(u64::from(proof.num_queries)));
        out.extend_from_slice(&proof.query_seed);
        Ok(out)
    }

    fn base_verification_gas(&self) -> u64 {
        450_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> VerificationKey {
        let bytes = StarkAdapter.derive_verification_key(ClaimType::Identity, 2);
        VerificationKey::new(ProofSystem::Stark, ClaimType::Identity, bytes)
    }

    fn inputs() -> Vec<String> {
        vec!["18".to_string(), "2".to_string()]
    }

    #[test]
    fn test_key_layout() {
        let key = key();
        let parsed = StarkKey::from_bytes(&key.bytes).unwrap();
        assert_eq!(parsed.fri_layers, 6);
        assert_eq!(parsed.num_queries, 30);
        assert_eq!(parsed.num_public_inputs, 2);
        assert_eq!(parsed.to_bytes(), key.bytes);
    }

    #[test]
    fn test_sealed_proof_verifies() {
        let key = key();
        let proof = StarkAdapter.seal(&key, &inputs(), &[9u8; 32]).unwrap();

        assert_eq!(proof.len(), proof_size(6));
        assert!(StarkAdapter.verify(&proof, &inputs(), &key).unwrap());
    }

    #[test]
    fn test_tampered_layer_root_rejected() {
        let key = key();
        let mut proof = StarkAdapter.seal(&key, &inputs(), &[9u8; 32]).unwrap();
        // first byte of the first FRI root
        proof[4 + 64] ^= 0x80;

        assert!(!StarkAdapter.verify(&proof, &inputs(), &key).unwrap());
    }

    #[test]
    fn test_inconsistent_length_is_format_error() {
        let key = key();
        let mut proof = StarkAdapter.seal(&key, &inputs(), &[9u8; 32]).unwrap();
        proof.truncate(proof.len() - 1);

        assert!(matches!(
            StarkAdapter.verify(&proof, &inputs(), &key),
            Err(VeilError::InvalidProofFormat(_))
        ));
    }

    #[test]
    fn test_distinct_blindings_give_distinct_proofs() {
        let key = key();
        let first = StarkAdapter.seal(&key, &inputs(), &[1u8; 32]).unwrap();
        let second = StarkAdapter.seal(&key, &inputs(), &[2u8; 32]).unwrap();

        assert_ne!(first, second);
        assert!(StarkAdapter.verify(&second, &inputs(), &key).unwrap());
    }

    #[test]
    fn test_calldata_layout() {
        let key = key();
        let proof_bytes = StarkAdapter.seal(&key, &inputs(), &[9u8; 32]).unwrap();
        let proof = StarkProof::from_bytes(&proof_bytes).unwrap();
        let calldata = StarkAdapter.serialize_calldata(&proof_bytes, &inputs()).unwrap();

        assert_eq!(calldata.len(), (1 + 2 + 1 + 2 + 6 + 1 + 1 + 1) * FIELD_SIZE);
        assert_eq!(calldata[31], 2);
        assert_eq!(calldata[3 * 32 + 31], 6);
        assert_eq!(&calldata[4 * 32..5 * 32], &proof.trace_root[..]);
        assert_eq!(&calldata[calldata.len() - 32..], &proof.query_seed[..]);
    }
}
