//! Dual-Key Stealth Address Protocol (DKSAP)
//!
//! The recipient publishes a meta-address `(Bv, Bs)`. For each payment the
//! sender picks an ephemeral `r`, publishes `R = r·G` and pays to
//!
//! ```text
//! S = r·Bv
//! P = H(S)·G + Bs
//! ```
//!
//! The recipient recomputes `S' = v·R` and checks `H(S')·G + Bs == P`. Only the
//! holder of `s` can spend, with `p = H(S) + s`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::IsIdentity;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use super::amount::{deobfuscate_amount, ObfuscatedAmount};
use super::keys::{decompress_point, hash_to_scalar, random_scalar, SecretScalar};
use crate::encoding::base58_key;
use crate::error::{Result, VeilError};

const SHARED_SECRET_DOMAIN: &[u8] = b"veil/stealth/v1";
const SEED_VIEWING_DOMAIN: &[u8] = b"veil/seed/viewing";
const SEED_SPENDING_DOMAIN: &[u8] = b"veil/seed/spending";

pub const META_ADDRESS_PREFIX: &str = "stealth:";
pub const VIEW_KEY_PREFIX: &str = "veilview:";

/// Publicly shareable recipient address `(Bv, Bs)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaAddress {
    pub viewing_pubkey: [u8; 32],
    pub spending_pubkey: [u8; 32],
}

impl MetaAddress {
    pub fn new(viewing_pubkey: [u8; 32], spending_pubkey: [u8; 32]) -> Result<Self> {
        decompress_point(&viewing_pubkey, "viewing public key")?;
        decompress_point(&spending_pubkey, "spending public key")?;
        Ok(Self {
            viewing_pubkey,
            spending_pubkey,
        })
    }

    fn to_bytes(self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.viewing_pubkey);
        bytes[32..].copy_from_slice(&self.spending_pubkey);
        bytes
    }
}

impl fmt::Display for MetaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{META_ADDRESS_PREFIX}{}",
            bs58::encode(self.to_bytes()).into_string()
        )
    }
}

impl FromStr for MetaAddress {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| VeilError::CryptoDerivation(format!("invalid meta-address: {reason}"));

        let encoded = s
            .trim()
            .strip_prefix(META_ADDRESS_PREFIX)
            .ok_or_else(|| invalid("missing 'stealth:' prefix"))?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|_| invalid("not base58"))?;
        if bytes.len() != 64 {
            return Err(invalid("expected 64 bytes"));
        }

        let mut viewing_pubkey = [0u8; 32];
        let mut spending_pubkey = [0u8; 32];
        viewing_pubkey.copy_from_slice(&bytes[..32]);
        spending_pubkey.copy_from_slice(&bytes[32..]);
        Self::new(viewing_pubkey, spending_pubkey)
    }
}

impl Serialize for MetaAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MetaAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One-time payment address `P`, shown as base58
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OneTimeAddress(#[serde(with = "base58_key")] [u8; 32]);

impl OneTimeAddress {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for OneTimeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl FromStr for OneTimeAddress {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        crate::encoding::decode_base58_key(s.trim())
            .map(Self)
            .map_err(|e| VeilError::CryptoDerivation(format!("invalid one-time address: {e}")))
    }
}

/// Sender-side `(r, R = r·G)`. Used for one payment, wiped on drop.
pub struct EphemeralKeyPair {
    secret: SecretScalar,
    pub public: [u8; 32],
}

impl EphemeralKeyPair {
    pub fn generate() -> Self {
        let secret = SecretScalar::from_scalar(&random_scalar(&mut OsRng));
        let public = secret.public_key();
        Self { secret, public }
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public", &bs58::encode(self.public).into_string())
            .finish_non_exhaustive()
    }
}

/// A published payment: the ephemeral key and the address it pays to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    /// Position in the announcement stream
    pub sequence: u64,
    #[serde(with = "base58_key")]
    pub ephemeral_pubkey: [u8; 32],
    pub stealth_address: OneTimeAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<ObfuscatedAmount>,
}

/// A payment that belongs to the scanning recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPayment {
    pub sequence: u64,
    pub address: OneTimeAddress,
    #[serde(with = "base58_key")]
    pub ephemeral_pubkey: [u8; 32],
    /// Opened amount. `None` when the announcement carried no amount or the
    /// amount failed to open.
    pub amount: Option<u64>,
    /// The announcement carried an amount that did not open under this key.
    /// The address still matched, so the output is reported; its value is not.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub amount_rejected: bool,
}

fn shared_secret_scalar(shared: &EdwardsPoint) -> Result<Scalar> {
    if shared.is_identity() {
        return Err(VeilError::CryptoDerivation("shared secret is the identity".into()));
    }
    let mut compressed = shared.compress().to_bytes();
    let h = hash_to_scalar(SHARED_SECRET_DOMAIN, &compressed);
    compressed.zeroize();
    Ok(h)
}

fn one_time_point(h: &Scalar, spending_pubkey: &EdwardsPoint) -> Result<OneTimeAddress> {
    let point = EdwardsPoint::mul_base(h) + spending_pubkey;
    if point.is_identity() {
        return Err(VeilError::CryptoDerivation("one-time address is the identity".into()));
    }
    Ok(OneTimeAddress(point.compress().to_bytes()))
}

/// Sender side: `P = H(r·Bv)·G + Bs`
pub fn compute_one_time_address(
    meta: &MetaAddress,
    ephemeral: &EphemeralKeyPair,
) -> Result<OneTimeAddress> {
    let viewing = decompress_point(&meta.viewing_pubkey, "viewing public key")?;
    let spending = decompress_point(&meta.spending_pubkey, "spending public key")?;

    let shared = ephemeral.secret.to_scalar() * viewing;
    let h = shared_secret_scalar(&shared)?;
    one_time_point(&h, &spending)
}

/// Scan-only capability `(v, Bs)`: detects payments and opens amounts, cannot
/// spend
#[derive(Clone)]
pub struct ViewKey {
    viewing_key: SecretScalar,
    spending_pubkey: [u8; 32],
}

impl ViewKey {
    pub fn new(viewing_key: SecretScalar, spending_pubkey: [u8; 32]) -> Result<Self> {
        decompress_point(&spending_pubkey, "spending public key")?;
        Ok(Self {
            viewing_key,
            spending_pubkey,
        })
    }

    pub fn viewing_pubkey(&self) -> [u8; 32] {
        self.viewing_key.public_key()
    }

    pub fn spending_pubkey(&self) -> &[u8; 32] {
        &self.spending_pubkey
    }

    pub fn meta_address(&self) -> MetaAddress {
        MetaAddress {
            viewing_pubkey: self.viewing_pubkey(),
            spending_pubkey: self.spending_pubkey,
        }
    }

    /// Recipient side: `P' = H(v·R)·G + Bs`
    pub fn derive_address(&self, ephemeral_pubkey: &[u8; 32]) -> Result<OneTimeAddress> {
        let r = decompress_point(ephemeral_pubkey, "ephemeral public key")?;
        let spending = decompress_point(&self.spending_pubkey, "spending public key")?;
        let h = self.shared_scalar(&r)?;
        one_time_point(&h, &spending)
    }

    fn shared_scalar(&self, ephemeral: &EdwardsPoint) -> Result<Scalar> {
        shared_secret_scalar(&(self.viewing_key.to_scalar() * ephemeral))
    }

    /// Constant-time ownership check for one announcement
    pub fn owns(&self, announcement: &Announcement) -> Result<bool> {
        let expected = self.derive_address(&announcement.ephemeral_pubkey)?;
        Ok(bool::from(
            expected.as_bytes()[..].ct_eq(&announcement.stealth_address.as_bytes()[..]),
        ))
    }

    /// Open an amount sent to this recipient
    pub fn open_amount(&self, amount: &ObfuscatedAmount) -> Result<u64> {
        deobfuscate_amount(amount, &self.viewing_key)
    }

    /// Every announcement addressed to this key, in input order. Malformed
    /// announcements are skipped. An amount that fails to open is flagged on
    /// its own payment and does not stop the scan.
    pub fn scan(&self, announcements: &[Announcement]) -> Result<Vec<DetectedPayment>> {
        let mut detected = Vec::new();
        for announcement in announcements {
            match self.owns(announcement) {
                Ok(true) => {
                    let (amount, amount_rejected) = match &announcement.amount {
                        None => (None, false),
                        Some(amount) => match self.open_amount(amount) {
                            Ok(value) => (Some(value), false),
                            Err(err) => {
                                tracing::warn!(
                                    sequence = announcement.sequence,
                                    "amount failed to open: {err}"
                                );
                                (None, true)
                            }
                        },
                    };
                    detected.push(DetectedPayment {
                        sequence: announcement.sequence,
                        address: announcement.stealth_address,
                        ephemeral_pubkey: announcement.ephemeral_pubkey,
                        amount,
                        amount_rejected,
                    });
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::debug!(sequence = announcement.sequence, "skipping announcement: {err}");
                }
            }
        }
        Ok(detected)
    }

    /// Text form `veilview:<base58(v ‖ Bs)>`
    pub fn to_export_string(&self) -> Zeroizing<String> {
        let mut bytes = Zeroizing::new([0u8; 64]);
        bytes[..32].copy_from_slice(self.viewing_key.as_bytes());
        bytes[32..].copy_from_slice(&self.spending_pubkey);
        Zeroizing::new(format!(
            "{VIEW_KEY_PREFIX}{}",
            bs58::encode(bytes.as_slice()).into_string()
        ))
    }

    pub fn from_export_string(s: &str) -> Result<Self> {
        let invalid = || VeilError::CryptoDerivation("invalid view key".into());
        let encoded = s.trim().strip_prefix(VIEW_KEY_PREFIX).ok_or_else(invalid)?;
        let bytes = Zeroizing::new(bs58::decode(encoded).into_vec().map_err(|_| invalid())?);
        if bytes.len() != 64 {
            return Err(invalid());
        }

        let mut viewing = [0u8; 32];
        let mut spending_pubkey = [0u8; 32];
        viewing.copy_from_slice(&bytes[..32]);
        spending_pubkey.copy_from_slice(&bytes[32..]);
        Self::new(SecretScalar::from_bytes(viewing)?, spending_pubkey)
    }
}

impl fmt::Debug for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewKey")
            .field("spending_pubkey", &bs58::encode(self.spending_pubkey).into_string())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressMetadata {
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A recipient's stealth identity. Both private keys stay here.
pub struct StealthAddress {
    pub address: MetaAddress,
    viewing_key: SecretScalar,
    spending_key: SecretScalar,
    pub metadata: AddressMetadata,
}

impl StealthAddress {
    /// Fresh random viewing and spending keys
    pub fn generate() -> Self {
        let viewing = SecretScalar::from_scalar(&random_scalar(&mut OsRng));
        let spending = SecretScalar::from_scalar(&random_scalar(&mut OsRng));
        let mut address = Self::from_keys(viewing, spending);
        address.metadata.created_at = Some(Utc::now());
        address
    }

    /// Deterministic keys from a seed (e.g. a BIP-39 seed):
    /// `v = SHA-256("veil/seed/viewing" ‖ seed)`, likewise for `s`
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let derive = |domain: &[u8]| -> Result<SecretScalar> {
            let mut hasher = Sha256::new();
            hasher.update(domain);
            hasher.update(seed);
            SecretScalar::from_bytes(hasher.finalize().into())
        };
        Ok(Self::from_keys(
            derive(SEED_VIEWING_DOMAIN)?,
            derive(SEED_SPENDING_DOMAIN)?,
        ))
    }

    /// Rebuild from stored secrets
    pub fn from_secrets(viewing: [u8; 32], spending: [u8; 32]) -> Result<Self> {
        Ok(Self::from_keys(
            SecretScalar::from_bytes(viewing)?,
            SecretScalar::from_bytes(spending)?,
        ))
    }

    fn from_keys(viewing_key: SecretScalar, spending_key: SecretScalar) -> Self {
        let address = MetaAddress {
            viewing_pubkey: viewing_key.public_key(),
            spending_pubkey: spending_key.public_key(),
        };
        Self {
            address,
            viewing_key,
            spending_key,
            metadata: AddressMetadata::default(),
        }
    }

    pub fn viewing_key(&self) -> &SecretScalar {
        &self.viewing_key
    }

    pub fn spending_key(&self) -> &SecretScalar {
        &self.spending_key
    }

    pub fn view_key(&self) -> ViewKey {
        ViewKey {
            viewing_key: self.viewing_key.clone(),
            spending_pubkey: self.address.spending_pubkey,
        }
    }

    /// Recipient side of the protocol. Equal to the sender's `P` iff the
    /// payment was made to this recipient.
    pub fn derive_address(&self, ephemeral_pubkey: &[u8; 32]) -> Result<OneTimeAddress> {
        self.view_key().derive_address(ephemeral_pubkey)
    }

    /// One-time spending key `p = H(v·R) + s`, with `p·G == P`
    pub fn spending_key_for(&self, ephemeral_pubkey: &[u8; 32]) -> Result<SecretScalar> {
        let r = decompress_point(ephemeral_pubkey, "ephemeral public key")?;
        let h = self.view_key().shared_scalar(&r)?;
        let mut p = h + self.spending_key.to_scalar();
        let secret = SecretScalar::from_scalar(&p);
        p.zeroize();
        Ok(secret)
    }

    pub fn scan(&self, announcements: &[Announcement]) -> Result<Vec<DetectedPayment>> {
        self.view_key().scan(announcements)
    }
}

impl fmt::Debug for StealthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StealthAddress")
            .field("address", &self.address.to_string())
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
