//! Veil core
//!
//! Two engines share this crate:
//!
//! - the proof lifecycle: validate a [`ProofRequest`], build a witness, prove
//!   it under Groth16, PLONK or STARK, then store, verify and export the
//!   resulting [`Proof`]
//! - stealth payments: one-time addresses derived from a recipient's
//!   [`MetaAddress`], amounts hidden behind Pedersen commitments, and
//!   periodic scanning for incoming payments
//!
//! Everything hangs off an explicitly constructed [`Engine`].

pub mod config;
pub mod crypto;
mod encoding;
pub mod engine;
pub mod error;
pub mod export;
pub mod generator;
pub mod monitor;
pub mod prover;
pub mod retry;
pub mod store;
pub mod transfer;
pub mod types;
pub mod validator;
pub mod verifier;
pub mod witness;
pub mod zk;

pub use config::{EngineConfig, TtlPolicy};
pub use crypto::{
    generate_stealth_address, Announcement, DetectedPayment, MetaAddress, ObfuscatedAmount,
    OneTimeAddress, StealthAddress, ViewKey,
};
pub use engine::Engine;
pub use error::{Result, VeilError};
pub use export::ExportFormat;
pub use monitor::{AnnouncementSource, MemoryAnnouncementSource, MonitorEvent, ScanMonitor};
pub use prover::{BackendProof, ProverBackend, ReferenceProver};
pub use retry::RetryPolicy;
pub use transfer::PrivateTransfer;
pub use types::{ClaimType, Proof, ProofId, ProofRequest, ProofStatus, ProofSystem};

#[cfg(test)]
mod tests;

#[cfg(test)]
mod fuzz_tests;
