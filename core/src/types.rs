//! Core data model: claim types, proof systems, requests and proof records

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::encoding::hex_bytes;
use crate::error::VeilError;
use crate::zk::VerificationKey;

/// Kind of on-chain fact a proof attests to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    Ownership,
    Balance,
    Transaction,
    Identity,
}

impl ClaimType {
    pub const ALL: [ClaimType; 4] = [
        ClaimType::Ownership,
        ClaimType::Balance,
        ClaimType::Transaction,
        ClaimType::Identity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Ownership => "ownership",
            ClaimType::Balance => "balance",
            ClaimType::Transaction => "transaction",
            ClaimType::Identity => "identity",
        }
    }

    /// Required claim fields, in public-input order
    pub fn claim_fields(&self) -> &'static [&'static str] {
        match self {
            ClaimType::Ownership => &["assetId", "collection"],
            ClaimType::Balance => &["minBalance", "token"],
            ClaimType::Transaction => &["txHash", "chainId"],
            ClaimType::Identity => &["ageOver", "kycLevel"],
        }
    }

    pub fn required_private_fields(&self) -> &'static [&'static str] {
        match self {
            ClaimType::Ownership | ClaimType::Balance | ClaimType::Transaction => {
                &["address", "signature"]
            }
            ClaimType::Identity => &["dateOfBirth", "country", "kycSignature"],
        }
    }

    pub fn optional_private_fields(&self) -> &'static [&'static str] {
        match self {
            ClaimType::Balance => &["actualBalance"],
            _ => &[],
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimType {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| VeilError::Serialization(format!("unknown claim type: {s}")))
    }
}

/// Supported proof systems. Closed set: adding one means extending every
/// adapter `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofSystem {
    Groth16,
    Plonk,
    Stark,
}

impl ProofSystem {
    pub const ALL: [ProofSystem; 3] = [ProofSystem::Groth16, ProofSystem::Plonk, ProofSystem::Stark];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProofSystem::Groth16 => "groth16",
            ProofSystem::Plonk => "plonk",
            ProofSystem::Stark => "stark",
        }
    }
}

impl fmt::Display for ProofSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofSystem {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProofSystem::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VeilError::UnsupportedProofSystem(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofStatus {
    Pending,
    Ready,
    Verified,
    Expired,
    Failed,
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProofStatus::Pending => "pending",
            ProofStatus::Ready => "ready",
            ProofStatus::Verified => "verified",
            ProofStatus::Expired => "expired",
            ProofStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofId(Uuid);

impl ProofId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProofId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProofId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ProofId {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| VeilError::Serialization(format!("invalid proof id: {e}")))
    }
}

/// A request to prove a claim about on-chain state.
///
/// `private_inputs` are wiped on drop and never printed.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    #[serde(default)]
    pub claim: BTreeMap<String, String>,
    #[serde(default)]
    pub private_inputs: BTreeMap<String, String>,
    #[serde(default)]
    pub proof_system: Option<String>,
}

impl ProofRequest {
    pub fn new(claim_type: ClaimType) -> Self {
        Self {
            claim_type,
            claim: BTreeMap::new(),
            private_inputs: BTreeMap::new(),
            proof_system: None,
        }
    }

    pub fn with_claim(mut self, key: &str, value: &str) -> Self {
        self.claim.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_private_input(mut self, key: &str, value: &str) -> Self {
        self.private_inputs.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_proof_system(mut self, system: &str) -> Self {
        self.proof_system = Some(system.to_string());
        self
    }
}

impl fmt::Debug for ProofRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofRequest")
            .field("claim_type", &self.claim_type)
            .field("claim", &self.claim)
            .field("private_inputs", &self.private_inputs.keys().collect::<Vec<_>>())
            .field("proof_system", &self.proof_system)
            .finish()
    }
}

impl Drop for ProofRequest {
    fn drop(&mut self) {
        for value in self.private_inputs.values_mut() {
            value.zeroize();
        }
    }
}

/// A generated proof and its lifecycle metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    pub id: ProofId,
    #[serde(with = "hex_bytes")]
    pub proof_bytes: Vec<u8>,
    pub public_inputs: Vec<String>,
    pub verification_key: VerificationKey,
    pub proof_system: ProofSystem,
    pub claim_type: ClaimType,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: ProofStatus,
}

impl Proof {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires_at| now > expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proof_system_parsing() {
        assert_eq!("groth16".parse::<ProofSystem>().unwrap(), ProofSystem::Groth16);
        assert_eq!("PLONK".parse::<ProofSystem>().unwrap(), ProofSystem::Plonk);
        assert!(matches!(
            "bulletproofs".parse::<ProofSystem>(),
            Err(VeilError::UnsupportedProofSystem(s)) if s == "bulletproofs"
        ));
    }

    #[test]
    fn test_request_debug_hides_private_values() {
        let request = ProofRequest::new(ClaimType::Balance)
            .with_claim("minBalance", "10.0")
            .with_private_input("actualBalance", "25.5");

        let printed = format!("{:?}", request);
        assert!(printed.contains("actualBalance"));
        assert!(!printed.contains("25.5"));
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{
            "type": "balance",
            "claim": {"minBalance": "10.0", "token": "ETH"},
            "privateInputs": {"address": "0xabc", "signature": "0xsig"},
            "proofSystem": "groth16"
        }"#;
        let request: ProofRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.claim_type, ClaimType::Balance);
        assert_eq!(request.private_inputs.len(), 2);
        assert_eq!(request.proof_system.as_deref(), Some("groth16"));
    }
}
