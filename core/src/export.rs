//! Proof export and gas estimation
//!
//! `json` is self-describing and imports back to an equal [`Proof`].
//! `calldata` is the adapter's packed encoding for an on-chain verifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeilError};
use crate::types::{Proof, ProofSystem};
use crate::zk::{Adapter, ProofSystemAdapter};

/// Tag written into every JSON export
pub const EXPORT_FORMAT_TAG: &str = "veil-proof/v1";

/// Calldata cost per byte
pub const GAS_PER_CALLDATA_BYTE: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Calldata,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Calldata => f.write_str("calldata"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "calldata" => Ok(ExportFormat::Calldata),
            other => Err(VeilError::Serialization(format!("unknown export format: {other}"))),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ExportEnvelope {
    format: String,
    #[serde(flatten)]
    proof: Proof,
}

pub fn export_json(proof: &Proof) -> Result<String> {
    let envelope = ExportEnvelope {
        format: EXPORT_FORMAT_TAG.to_string(),
        proof: proof.clone(),
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

pub fn import_json(json: &str) -> Result<Proof> {
    let envelope: ExportEnvelope = serde_json::from_str(json)?;
    if envelope.format != EXPORT_FORMAT_TAG {
        return Err(VeilError::Serialization(format!(
            "unsupported export format '{}'",
            envelope.format
        )));
    }
    Ok(envelope.proof)
}

pub fn export_calldata(proof: &Proof) -> Result<Vec<u8>> {
    Adapter::for_system(proof.proof_system).serialize_calldata(&proof.proof_bytes, &proof.public_inputs)
}

/// Export in the given format as text; calldata is `0x`-prefixed hex
pub fn export_proof(proof: &Proof, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => export_json(proof),
        ExportFormat::Calldata => Ok(format!("0x{}", hex::encode(export_calldata(proof)?))),
    }
}

/// Base verification cost plus 16 gas per proof byte carried in calldata
pub fn estimate_gas(proof_system: ProofSystem, proof_size: usize) -> u64 {
    Adapter::for_system(proof_system)
        .base_verification_gas()
        .saturating_add(GAS_PER_CALLDATA_BYTE.saturating_mul(proof_size as u64))
}
