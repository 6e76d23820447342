//! Encrypted recipient key storage
//!
//! Uses AES-256-GCM for encryption and Argon2id for key derivation.
//! Viewing and spending secrets are never stored in plaintext; the public
//! meta-address is kept alongside so `veil address` needs no password.

use std::fs;
use std::path::PathBuf;

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{bail, Context, Result};
use argon2::{
    password_hash::{rand_core::RngCore, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use serde::{Deserialize, Serialize};
use veil_core::{MetaAddress, StealthAddress};
use zeroize::{Zeroize, Zeroizing};

use crate::config::write_private;

/// Argon2 parameters for key derivation
const ARGON2_M_COST: u32 = 65536; // 64 MB memory
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;

const KEY_FILE_VERSION: u8 = 1;

/// Encrypted key file format
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedKeyFile {
    pub version: u8,
    /// Public, so the address can be shown without unlocking
    pub meta_address: String,
    /// Salt for Argon2
    pub salt: String,
    /// Nonce for AES-GCM (base64)
    pub nonce: String,
    /// Encrypted data (base64)
    pub ciphertext: String,
    /// Password hash for verification
    pub password_hash: Option<String>,
    pub created_at: String,
}

/// Unencrypted key data (internal use only)
#[derive(Serialize, Deserialize, Zeroize)]
#[zeroize(drop)]
pub struct KeyData {
    pub viewing_secret: [u8; 32],
    pub spending_secret: [u8; 32],
}

impl KeyData {
    pub fn from_recipient(recipient: &StealthAddress) -> Self {
        Self {
            viewing_secret: *recipient.viewing_key().as_bytes(),
            spending_secret: *recipient.spending_key().as_bytes(),
        }
    }

    pub fn to_recipient(&self) -> Result<StealthAddress> {
        StealthAddress::from_secrets(self.viewing_secret, self.spending_secret)
            .context("Stored keys are not valid recipient secrets")
    }
}

fn argon2() -> Result<Argon2<'static>> {
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2::Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(32))
            .map_err(|e| anyhow::anyhow!("Argon2 params error: {}", e))?,
    ))
}

fn derive_cipher(argon2: &Argon2<'_>, password: &str, salt: &str) -> Result<Aes256Gcm> {
    let mut key_bytes = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut key_bytes[..])
        .map_err(|e| anyhow::anyhow!("Key derivation failed: {}", e))?;
    Aes256Gcm::new_from_slice(&key_bytes[..])
        .map_err(|e| anyhow::anyhow!("Cipher creation failed: {}", e))
}

impl EncryptedKeyFile {
    /// Encrypt key data with a password
    pub fn encrypt(data: &KeyData, meta_address: &MetaAddress, password: &str) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = argon2()?;
        let cipher = derive_cipher(&argon2, password, salt.as_str())?;

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);

        let plaintext = Zeroizing::new(serde_json::to_vec(data)?);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
            .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .ok()
            .map(|h| h.to_string());

        Ok(Self {
            version: KEY_FILE_VERSION,
            meta_address: meta_address.to_string(),
            salt: salt.as_str().to_string(),
            nonce: b64::encode(&nonce_bytes),
            ciphertext: b64::encode(&ciphertext),
            password_hash,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Decrypt key data with a password
    pub fn decrypt(&self, password: &str) -> Result<KeyData> {
        if self.version != KEY_FILE_VERSION {
            bail!("Unsupported key file version {}", self.version);
        }

        if let Some(ref hash) = self.password_hash {
            let parsed_hash = argon2::PasswordHash::new(hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .map_err(|_| anyhow::anyhow!("Invalid password"))?;
        }

        let cipher = derive_cipher(&argon2()?, password, &self.salt)?;

        let nonce_bytes = b64::decode(&self.nonce).context("Invalid nonce encoding")?;
        let ciphertext = b64::decode(&self.ciphertext).context("Invalid ciphertext encoding")?;
        if nonce_bytes.len() != 12 {
            bail!("Invalid nonce length");
        }

        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
                .map_err(|_| anyhow::anyhow!("Decryption failed - wrong password or corrupted data"))?,
        );

        serde_json::from_slice(&plaintext).context("Failed to parse decrypted key data")
    }

    pub fn meta_address(&self) -> Result<MetaAddress> {
        self.meta_address
            .parse()
            .context("Key file holds an invalid meta-address")
    }
}

/// Key storage manager
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn save(&self, recipient: &StealthAddress, password: &str) -> Result<()> {
        let data = KeyData::from_recipient(recipient);
        let encrypted = EncryptedKeyFile::encrypt(&data, &recipient.address, password)?;
        let json = serde_json::to_string_pretty(&encrypted)?;
        write_private(&self.path, json.as_bytes())
    }

    fn read(&self) -> Result<EncryptedKeyFile> {
        if !self.exists() {
            bail!("No keys found at {}. Run 'veil keygen' first.", self.path.display());
        }
        let json = fs::read_to_string(&self.path).context("Failed to read encrypted key file")?;
        serde_json::from_str(&json).context("Failed to parse encrypted key file")
    }

    /// The public meta-address, without a password
    pub fn meta_address(&self) -> Result<MetaAddress> {
        self.read()?.meta_address()
    }

    /// Decrypt and rebuild the recipient
    pub fn load(&self, password: &str) -> Result<StealthAddress> {
        let file = self.read()?;
        let recipient = file.decrypt(password)?.to_recipient()?;
        if recipient.address != file.meta_address()? {
            bail!("Decrypted keys do not match the stored meta-address");
        }
        Ok(recipient)
    }
}

/// Password strength validation
pub fn validate_password_strength(password: &str) -> Result<()> {
    if password.len() < 8 {
        bail!("Password must be at least 8 characters");
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_numeric());

    if !has_upper || !has_lower || !has_digit {
        bail!("Password must contain uppercase, lowercase, and numeric characters");
    }

    Ok(())
}

/// Prompt for password securely (hides input)
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    rpassword::prompt_password(prompt)
        .map(Zeroizing::new)
        .context("Failed to read password")
}

/// Prompt for password with confirmation
pub fn prompt_new_password(prompt: &str) -> Result<Zeroizing<String>> {
    let password = prompt_password(prompt)?;
    let confirm = prompt_password("Confirm password: ")?;

    if *password != *confirm {
        bail!("Passwords do not match");
    }

    validate_password_strength(&password)?;
    Ok(password)
}

/// Derive recipient keys from a BIP-39 phrase
pub fn recipient_from_mnemonic(phrase: &str, passphrase: &str) -> Result<StealthAddress> {
    let mnemonic: bip39::Mnemonic = phrase
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid mnemonic: {}", e))?;
    let seed = Zeroizing::new(mnemonic.to_seed(passphrase));
    StealthAddress::from_seed(&seed[..]).context("Failed to derive keys from mnemonic")
}

/// Fresh 24-word phrase and the keys it derives
pub fn generate_with_mnemonic() -> Result<(StealthAddress, Zeroizing<String>)> {
    let mut entropy = [0u8; 32];
    OsRng.fill_bytes(&mut entropy);
    let mnemonic = bip39::Mnemonic::from_entropy(&entropy)
        .map_err(|e| anyhow::anyhow!("Failed to generate mnemonic: {}", e));
    entropy.zeroize();

    let phrase = Zeroizing::new(mnemonic?.to_string());
    let recipient = recipient_from_mnemonic(&phrase, "")?;
    Ok((recipient, phrase))
}

// Base64 encoding/decoding helpers
mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine};

    pub fn encode(data: &[u8]) -> String {
        STANDARD.encode(data)
    }

    pub fn decode(s: &str) -> anyhow::Result<Vec<u8>> {
        STANDARD.decode(s).map_err(|e| anyhow::anyhow!("Base64 decode error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PASSWORD: &str = "TestPassword123";
    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path().join("keys.enc"));
        let recipient = StealthAddress::generate();

        store.save(&recipient, PASSWORD).unwrap();
        assert_eq!(store.meta_address().unwrap(), recipient.address);

        let loaded = store.load(PASSWORD).unwrap();
        assert_eq!(loaded.address, recipient.address);
        assert_eq!(loaded.viewing_key().as_bytes(), recipient.viewing_key().as_bytes());
    }

    #[test]
    fn test_wrong_password_fails() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path().join("keys.enc"));
        store.save(&StealthAddress::generate(), PASSWORD).unwrap();

        assert!(store.load("WrongPassword123").is_err());
    }

    #[test]
    fn test_secrets_not_in_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.enc");
        let recipient = StealthAddress::generate();
        KeyStore::new(path.clone()).save(&recipient, PASSWORD).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let file: EncryptedKeyFile = serde_json::from_str(&contents).unwrap();
        assert_eq!(file.version, KEY_FILE_VERSION);
        assert!(!contents.contains(&b64::encode(recipient.spending_key().as_bytes())));
        assert!(!contents.contains(PASSWORD));
    }

    #[test]
    fn test_missing_store() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path().join("absent.enc"));
        assert!(!store.exists());
        assert!(store.meta_address().is_err());
    }

    #[test]
    fn test_mnemonic_derivation_is_stable() {
        let first = recipient_from_mnemonic(PHRASE, "").unwrap();
        let second = recipient_from_mnemonic(PHRASE, "").unwrap();
        assert_eq!(first.address, second.address);

        let other = recipient_from_mnemonic(PHRASE, "password").unwrap();
        assert_ne!(first.address, other.address);

        assert!(recipient_from_mnemonic("not a real phrase", "").is_err());
    }

    #[test]
    fn test_generated_mnemonic_recovers() {
        let (recipient, phrase) = generate_with_mnemonic().unwrap();
        assert_eq!(phrase.split_whitespace().count(), 24);
        assert_eq!(recipient_from_mnemonic(&phrase, "").unwrap().address, recipient.address);
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password_strength("short").is_err());
        assert!(validate_password_strength("alllowercase").is_err());
        assert!(validate_password_strength("NoNumbers").is_err());
        assert!(validate_password_strength("ValidPass123").is_ok());
    }
}
