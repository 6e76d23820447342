//! Stealth addressing and amount obfuscation on Curve25519

pub mod amount;
pub mod keys;
pub mod stealth;

pub use amount::{deobfuscate_amount, obfuscate_amount, ObfuscatedAmount};
pub use keys::SecretScalar;
pub use stealth::{
    compute_one_time_address, AddressMetadata, Announcement, DetectedPayment, EphemeralKeyPair,
    MetaAddress, OneTimeAddress, StealthAddress, ViewKey,
};

/// Create a fresh recipient identity
pub fn generate_stealth_address() -> StealthAddress {
    StealthAddress::generate()
}
