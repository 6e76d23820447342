//! Engine configuration
//!
//! Every policy the engine applies (default proof system, proof lifetimes,
//! retry schedule, scan cadence) lives here so callers can override it from a
//! configuration file instead of relying on constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;
use crate::types::{ClaimType, ProofSystem};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Used when a request does not name a proof system. Groth16 by default:
    /// smallest proof, cheapest on-chain verification.
    pub default_proof_system: ProofSystem,
    pub ttl: TtlPolicy,
    pub retry: RetryPolicy,
    /// Upper bound on a single prover backend call before it counts as a
    /// transient failure
    pub backend_timeout_ms: u64,
    /// Period of each monitored target's scan task
    pub scan_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_proof_system: ProofSystem::Groth16,
            ttl: TtlPolicy::default(),
            retry: RetryPolicy::default(),
            backend_timeout_ms: 30_000,
            scan_interval_ms: 15_000,
        }
    }
}

impl EngineConfig {
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(1))
    }
}

/// Proof lifetimes per claim type, in seconds. Zero means the proof never
/// expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TtlPolicy {
    pub ownership_secs: u64,
    pub balance_secs: u64,
    pub transaction_secs: u64,
    /// Identity/KYC attestations go stale fastest
    pub identity_secs: u64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            ownership_secs: 24 * 60 * 60,
            balance_secs: 60 * 60,
            transaction_secs: 7 * 24 * 60 * 60,
            identity_secs: 15 * 60,
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for(&self, claim_type: ClaimType) -> Option<chrono::Duration> {
        let secs = match claim_type {
            ClaimType::Ownership => self.ownership_secs,
            ClaimType::Balance => self.balance_secs,
            ClaimType::Transaction => self.transaction_secs,
            ClaimType::Identity => self.identity_secs,
        };
        if secs == 0 {
            return None;
        }
        i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds)
    }
}
