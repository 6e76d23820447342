//! Error types for the Veil engine

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{ProofId, ProofStatus};
use crate::validator::ValidationError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, VeilError>;

#[derive(Debug, Error)]
pub enum VeilError {
    /// The request is missing fields or carries malformed ones. Never retried.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The witness does not satisfy the circuit. Deliberately carries no detail.
    #[error("witness does not satisfy the circuit constraints")]
    ConstraintViolation,

    /// Transient prover backend or network failure.
    #[error("prover backend failure: {0}")]
    ProverBackend(String),

    #[error("proof {id} expired at {expired_at}")]
    ProofExpired {
        id: ProofId,
        expired_at: DateTime<Utc>,
    },

    #[error("unsupported proof system: {0}")]
    UnsupportedProofSystem(String),

    #[error("invalid proof format: {0}")]
    InvalidProofFormat(String),

    /// Degenerate point or identity element in stealth derivation
    #[error("key derivation failed: {0}")]
    CryptoDerivation(String),

    /// Wrong key or tampered commitment while opening an amount
    #[error("commitment does not match the opened amount")]
    CommitmentMismatch,

    #[error("proof not found: {0}")]
    ProofNotFound(ProofId),

    #[error("proof {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: ProofId,
        from: ProofStatus,
        to: ProofStatus,
    },

    #[error("unknown circuit: {0}")]
    UnknownCircuit(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("announcement source error: {0}")]
    Source(String),
}

impl VeilError {
    /// Whether the proof generator may retry the failed attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, VeilError::ProverBackend(_))
    }
}

impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        VeilError::Serialization(err.to_string())
    }
}
