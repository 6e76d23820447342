//! Scalar and point helpers shared by the stealth and amount code

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{Result, VeilError};

/// A scalar that zeroizes its bytes on drop.
///
/// Clone is derived for key export; every copy wipes itself.
#[derive(Clone)]
pub struct SecretScalar {
    bytes: [u8; 32],
}

impl SecretScalar {
    pub fn from_scalar(scalar: &Scalar) -> Self {
        Self {
            bytes: scalar.to_bytes(),
        }
    }

    /// Reduce arbitrary bytes mod ℓ. Zero is rejected.
    pub fn from_bytes(mut bytes: [u8; 32]) -> Result<Self> {
        let scalar = Scalar::from_bytes_mod_order(bytes);
        bytes.zeroize();
        if scalar == Scalar::ZERO {
            return Err(VeilError::CryptoDerivation("secret scalar is zero".into()));
        }
        Ok(Self::from_scalar(&scalar))
    }

    pub fn to_scalar(&self) -> Scalar {
        Scalar::from_bytes_mod_order(self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Compressed public point `x·G`
    pub fn public_key(&self) -> [u8; 32] {
        EdwardsPoint::mul_base(&self.to_scalar()).compress().to_bytes()
    }
}

impl Drop for SecretScalar {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SecretScalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretScalar(..)")
    }
}

/// Uniform non-zero scalar from 64 random bytes
pub(crate) fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    loop {
        let mut wide = [0u8; 64];
        rng.fill_bytes(&mut wide);
        let scalar = Scalar::from_bytes_mod_order_wide(&wide);
        wide.zeroize();
        if scalar != Scalar::ZERO {
            return scalar;
        }
    }
}

/// SHA-256(domain ‖ data) reduced mod ℓ
pub(crate) fn hash_to_scalar(domain: &[u8], data: &[u8]) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    let mut digest: [u8; 32] = hasher.finalize().into();
    let scalar = Scalar::from_bytes_mod_order(digest);
    digest.zeroize();
    scalar
}

/// Decompress a public point, rejecting undecodable and small-order values
pub(crate) fn decompress_point(bytes: &[u8; 32], what: &str) -> Result<EdwardsPoint> {
    let point = CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or_else(|| VeilError::CryptoDerivation(format!("{what} is not a curve point")))?;
    if point.is_small_order() {
        return Err(VeilError::CryptoDerivation(format!("{what} has small order")));
    }
    Ok(point)
}
