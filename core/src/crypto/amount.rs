//! Amount obfuscation
//!
//! An amount is hidden behind a Pedersen commitment on Ristretto,
//! `C = amount·H + b·G`, and `(amount, b)` is sealed to the recipient's viewing
//! key with ECIES (ephemeral `e`, `K = SHA-256(domain ‖ e·Bv ‖ E)`,
//! AES-256-GCM with `C` as associated data).
//!
//! Payload layout: `E (32) ‖ nonce (12) ‖ ciphertext (8 + 32 + 16 tag)`.
//!
//! Opening fails closed: a wrong key, a tampered payload and a payload that
//! decrypts to a different commitment all yield `CommitmentMismatch`.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use super::keys::{decompress_point, random_scalar, SecretScalar};
use crate::encoding::{hex_array, hex_bytes};
use crate::error::{Result, VeilError};

const GENERATOR_H_DOMAIN: &[u8] = b"veil/amount/generator_h/v1";
const ENCRYPTION_DOMAIN: &[u8] = b"veil/amount/ecies/v1";

const NONCE_SIZE: usize = 12;
const PLAINTEXT_SIZE: usize = 8 + 32;
const TAG_SIZE: usize = 16;
pub const PAYLOAD_SIZE: usize = 32 + NONCE_SIZE + PLAINTEXT_SIZE + TAG_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObfuscatedAmount {
    /// Compressed Ristretto point
    #[serde(with = "hex_array")]
    pub commitment: [u8; 32],
    #[serde(with = "hex_bytes")]
    pub encrypted_payload: Vec<u8>,
}

/// Second generator with no known discrete log relative to G
fn generator_h() -> RistrettoPoint {
    let mut hasher = Sha512::new();
    hasher.update(GENERATOR_H_DOMAIN);
    RistrettoPoint::from_uniform_bytes(&hasher.finalize().into())
}

fn commit(amount: u64, blinding: &Scalar) -> [u8; 32] {
    (Scalar::from(amount) * generator_h() + RistrettoPoint::mul_base(blinding))
        .compress()
        .to_bytes()
}

fn encryption_key(shared: &EdwardsPoint, ephemeral_pubkey: &[u8; 32]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(ENCRYPTION_DOMAIN);
    hasher.update(shared.compress().as_bytes());
    hasher.update(ephemeral_pubkey);
    Zeroizing::new(hasher.finalize().into())
}

/// Commit to `amount` and seal the opening to `viewing_pubkey`
pub fn obfuscate_amount(amount: u64, viewing_pubkey: &[u8; 32]) -> Result<ObfuscatedAmount> {
    let viewing = decompress_point(viewing_pubkey, "viewing public key")?;

    let mut blinding = random_scalar(&mut OsRng);
    let commitment = commit(amount, &blinding);

    let ephemeral = SecretScalar::from_scalar(&random_scalar(&mut OsRng));
    let ephemeral_pubkey = ephemeral.public_key();
    let key = encryption_key(&(ephemeral.to_scalar() * viewing), &ephemeral_pubkey);

    let mut plaintext = Zeroizing::new([0u8; PLAINTEXT_SIZE]);
    plaintext[..8].copy_from_slice(&amount.to_le_bytes());
    plaintext[8..].copy_from_slice(blinding.as_bytes());
    blinding.zeroize();

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| VeilError::CryptoDerivation(format!("cipher setup failed: {e}")))?;
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext.as_slice(),
                aad: &commitment,
            },
        )
        .map_err(|_| VeilError::CryptoDerivation("amount encryption failed".into()))?;

    let mut encrypted_payload = Vec::with_capacity(PAYLOAD_SIZE);
    encrypted_payload.extend_from_slice(&ephemeral_pubkey);
    encrypted_payload.extend_from_slice(&nonce);
    encrypted_payload.extend_from_slice(&ciphertext);

    Ok(ObfuscatedAmount {
        commitment,
        encrypted_payload,
    })
}

/// Open an obfuscated amount with the recipient's viewing key
pub fn deobfuscate_amount(obfuscated: &ObfuscatedAmount, viewing_key: &SecretScalar) -> Result<u64> {
    let payload = &obfuscated.encrypted_payload;
    if payload.len() != PAYLOAD_SIZE {
        return Err(VeilError::CommitmentMismatch);
    }
    if CompressedRistretto(obfuscated.commitment).decompress().is_none() {
        return Err(VeilError::CommitmentMismatch);
    }

    let mut ephemeral_pubkey = [0u8; 32];
    ephemeral_pubkey.copy_from_slice(&payload[..32]);
    let ephemeral = CompressedEdwardsY(ephemeral_pubkey)
        .decompress()
        .filter(|point| !point.is_small_order())
        .ok_or(VeilError::CommitmentMismatch)?;

    let key = encryption_key(&(viewing_key.to_scalar() * ephemeral), &ephemeral_pubkey);
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|_| VeilError::CommitmentMismatch)?;
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(
                Nonce::from_slice(&payload[32..32 + NONCE_SIZE]),
                Payload {
                    msg: &payload[32 + NONCE_SIZE..],
                    aad: &obfuscated.commitment,
                },
            )
            .map_err(|_| VeilError::CommitmentMismatch)?,
    );
    if plaintext.len() != PLAINTEXT_SIZE {
        return Err(VeilError::CommitmentMismatch);
    }

    let mut amount_bytes = [0u8; 8];
    amount_bytes.copy_from_slice(&plaintext[..8]);
    let amount = u64::from_le_bytes(amount_bytes);

    let mut blinding_bytes = Zeroizing::new([0u8; 32]);
    blinding_bytes.copy_from_slice(&plaintext[8..]);
    let mut blinding: Scalar = Option::from(Scalar::from_canonical_bytes(*blinding_bytes))
        .ok_or(VeilError::CommitmentMismatch)?;

    let recomputed = commit(amount, &blinding);
    blinding.zeroize();

    if bool::from(recomputed[..].ct_eq(&obfuscated.commitment[..])) {
        Ok(amount)
    } else {
        Err(VeilError::CommitmentMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::StealthAddress;

    #[test]
    fn test_round_trip() {
        let recipient = StealthAddress::generate();
        let obfuscated = obfuscate_amount(1_500_000, &recipient.address.viewing_pubkey).unwrap();

        assert_eq!(obfuscated.encrypted_payload.len(), PAYLOAD_SIZE);
        assert_eq!(
            deobfuscate_amount(&obfuscated, recipient.viewing_key()).unwrap(),
            1_500_000
        );
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let recipient = StealthAddress::generate();
        let other = StealthAddress::generate();
        let obfuscated = obfuscate_amount(42, &recipient.address.viewing_pubkey).unwrap();

        assert!(matches!(
            deobfuscate_amount(&obfuscated, other.viewing_key()),
            Err(VeilError::CommitmentMismatch)
        ));
        // The spending key is not the opening key either
        assert!(matches!(
            deobfuscate_amount(&obfuscated, recipient.spending_key()),
            Err(VeilError::CommitmentMismatch)
        ));
    }

    #[test]
    fn test_swapped_commitment_detected() {
        let recipient = StealthAddress::generate();
        let mut first = obfuscate_amount(10, &recipient.address.viewing_pubkey).unwrap();
        let second = obfuscate_amount(10, &recipient.address.viewing_pubkey).unwrap();

        // Same amount, different blinding: still a mismatch
        first.commitment = second.commitment;
        assert!(matches!(
            deobfuscate_amount(&first, recipient.viewing_key()),
            Err(VeilError::CommitmentMismatch)
        ));
    }

    #[test]
    fn test_tampered_payload_detected() {
        let recipient = StealthAddress::generate();
        let mut obfuscated = obfuscate_amount(7, &recipient.address.viewing_pubkey).unwrap();
        let last = obfuscated.encrypted_payload.len() - 1;
        obfuscated.encrypted_payload[last] ^= 0x01;

        assert!(matches!(
            deobfuscate_amount(&obfuscated, recipient.viewing_key()),
            Err(VeilError::CommitmentMismatch)
        ));

        obfuscated.encrypted_payload.truncate(10);
        assert!(matches!(
            deobfuscate_amount(&obfuscated, recipient.viewing_key()),
            Err(VeilError::CommitmentMismatch)
        ));
    }

    #[test]
    fn test_commitment_hides_amount() {
        let recipient = StealthAddress::generate();
        let a = obfuscate_amount(5, &recipient.address.viewing_pubkey).unwrap();
        let b = obfuscate_amount(5, &recipient.address.viewing_pubkey).unwrap();
        assert_ne!(a.commitment, b.commitment);
    }

    #[test]
    fn test_extreme_amounts() {
        let recipient = StealthAddress::generate();
        for amount in [0, 1, u64::MAX] {
            let obfuscated = obfuscate_amount(amount, &recipient.address.viewing_pubkey).unwrap();
            assert_eq!(
                deobfuscate_amount(&obfuscated, recipient.viewing_key()).unwrap(),
                amount
            );
        }
    }
}
