//! Field elements and Fiat-Shamir style transcripts
//!
//! Public inputs are mapped into the BN254 scalar field, and every proof
//! element is drawn from a SHA-256 transcript so that a proof is bound to its
//! verification key and public inputs.

use sha2::{Digest, Sha256};

/// BN254 scalar field modulus (r), big-endian
/// r = 21888242871839275222246405745257275088548364400416034343698204186575808495617
pub const SCALAR_FIELD_MODULUS: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29,
    0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58, 0x5d,
    0x97, 0x81, 0x6a, 0x91, 0x68, 0x71, 0xca, 0x8d,
    0x3c, 0x20, 0x8c, 0x16, 0xd8, 0x7c, 0xfd, 0x47,
];

pub const FIELD_SIZE: usize = 32;
pub const G1_SIZE: usize = 64;
pub const G2_SIZE: usize = 128;

const PUBLIC_INPUT_DOMAIN: &[u8] = b"veil/public_input/v1";

/// Check that a big-endian value is below the scalar field modulus
pub fn is_valid_scalar(scalar: &[u8]) -> bool {
    if scalar.len() != FIELD_SIZE {
        return false;
    }
    for i in 0..FIELD_SIZE {
        if scalar[i] < SCALAR_FIELD_MODULUS[i] {
            return true;
        }
        if scalar[i] > SCALAR_FIELD_MODULUS[i] {
            return false;
        }
    }
    false
}

/// Every coordinate of a serialized point is a valid, non-degenerate element
pub fn is_valid_point(point: &[u8]) -> bool {
    !point.iter().all(|&b| b == 0) && point.chunks(FIELD_SIZE).all(is_valid_scalar)
}

/// Reduce a digest into the field by clearing the top three bits.
/// 2^253 < r, so the result is always canonical.
fn reduce(mut bytes: [u8; 32]) -> [u8; 32] {
    bytes[0] &= 0x1f;
    bytes
}

/// Map a public input string to its field element
pub fn public_input_element(value: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(PUBLIC_INPUT_DOMAIN);
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
    reduce(hasher.finalize().into())
}

pub fn public_input_elements(values: &[String]) -> Vec<[u8; 32]> {
    values.iter().map(|v| public_input_element(v)).collect()
}

#[derive(Clone)]
pub struct Transcript {
    hasher: Sha256,
}

impl Transcript {
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((domain.len() as u64).to_be_bytes());
        hasher.update(domain);
        Self { hasher }
    }

    /// Absorb a labelled, length-prefixed message
    pub fn append(&mut self, label: &[u8], data: &[u8]) -> &mut Self {
        self.hasher.update((label.len() as u64).to_be_bytes());
        self.hasher.update(label);
        self.hasher.update((data.len() as u64).to_be_bytes());
        self.hasher.update(data);
        self
    }

    pub fn append_elements(&mut self, label: &[u8], elements: &[[u8; 32]]) -> &mut Self {
        self.hasher.update((elements.len() as u64).to_be_bytes());
        for element in elements {
            self.append(label, element);
        }
        self
    }

    /// Squeeze a field element without mutating the transcript
    pub fn challenge(&self, label: &[u8]) -> [u8; 32] {
        let mut hasher = self.hasher.clone();
        hasher.update(b"challenge");
        hasher.update((label.len() as u64).to_be_bytes());
        hasher.update(label);
        reduce(hasher.finalize().into())
    }

    pub fn g1(&self, label: &str) -> [u8; G1_SIZE] {
        let mut point = [0u8; G1_SIZE];
        for (i, chunk) in point.chunks_mut(FIELD_SIZE).enumerate() {
            chunk.copy_from_slice(&self.challenge(format!("{label}/{i}").as_bytes()));
        }
        point
    }

    pub fn g2(&self, label: &str) -> [u8; G2_SIZE] {
        let mut point = [0u8; G2_SIZE];
        for (i, chunk) in point.chunks_mut(FIELD_SIZE).enumerate() {
            chunk.copy_from_slice(&self.challenge(format!("{label}/{i}").as_bytes()));
        }
        point
    }
}

/// Big-endian length prefix used by the adapters' byte layouts
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_be_bytes(slice.try_into().ok()?))
}

/// Left-pad a small integer into a 32-byte word
pub(crate) fn word(value: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_scalar() {
        assert!(is_valid_scalar(&[0u8; 32]));

        let mut max_valid = SCALAR_FIELD_MODULUS;
        for i in (0..32).rev() {
            if max_valid[i] > 0 {
                max_valid[i] -= 1;
                break;
            }
            max_valid[i] = 0xFF;
        }
        assert!(is_valid_scalar(&max_valid));

        assert!(!is_valid_scalar(&SCALAR_FIELD_MODULUS));
        assert!(!is_valid_scalar(&[0xFF; 32]));
        assert!(!is_valid_scalar(&[0u8; 31]));
    }

    #[test]
    fn test_public_input_elements_are_canonical() {
        for value in ["10.0", "ETH", "", "0xabc"] {
            assert!(is_valid_scalar(&public_input_element(value)));
        }
        assert_ne!(public_input_element("10.0"), public_input_element("10"));
    }

    #[test]
    fn test_transcript_is_order_sensitive() {
        let mut t1 = Transcript::new(b"test");
        t1.append(b"a", b"1").append(b"b", b"2");
        let mut t2 = Transcript::new(b"test");
        t2.append(b"b", b"2").append(b"a", b"1");

        assert_ne!(t1.challenge(b"x"), t2.challenge(b"x"));
        assert_eq!(t1.challenge(b"x"), t1.clone().challenge(b"x"));
        assert!(is_valid_point(&t1.g2("B")));
    }
}
