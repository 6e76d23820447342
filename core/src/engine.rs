//! Engine context
//!
//! Owns configuration and collaborator handles and wires them into each
//! component. There is no global state: build one [`Engine`] and pass it
//! (or an `Arc` of it) to whatever needs it.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::config::EngineConfig;
use crate::crypto::MetaAddress;
use crate::error::{Result, VeilError};
use crate::export::{self, ExportFormat};
use crate::generator::ProofGenerator;
use crate::monitor::{AnnouncementSource, MonitorEvent, ScanMonitor};
use crate::prover::{ProverBackend, ReferenceProver};
use crate::store::ProofStore;
use crate::transfer::{prepare_payment, PrivateTransfer};
use crate::types::{ClaimType, Proof, ProofId, ProofRequest, ProofStatus, ProofSystem};
use crate::validator::{FieldIssue, FieldScope, IssueKind, ValidationError};
use crate::verifier::ProofVerifier;
use crate::zk::{CircuitRegistry, VerificationKey};

pub struct Engine {
    config: Arc<EngineConfig>,
    registry: Arc<CircuitRegistry>,
    store: Arc<ProofStore>,
    generator: ProofGenerator,
}

impl Engine {
    /// Engine with its own circuit registry. Use [`Engine::with_registry`]
    /// when the backend needs to look circuits up in the same registry.
    pub fn new(config: EngineConfig, backend: Arc<dyn ProverBackend>) -> Self {
        Self::with_registry(config, Arc::new(CircuitRegistry::new()), backend)
    }

    /// Engine backed by the in-process [`ReferenceProver`]
    pub fn with_reference_prover(config: EngineConfig) -> Self {
        let registry = Arc::new(CircuitRegistry::new());
        let backend = Arc::new(ReferenceProver::new(Arc::clone(&registry)));
        Self::with_registry(config, registry, backend)
    }

    /// Share `registry` with a backend that resolves circuits by id
    pub fn with_registry(
        config: EngineConfig,
        registry: Arc<CircuitRegistry>,
        backend: Arc<dyn ProverBackend>,
    ) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(ProofStore::new());
        let generator = ProofGenerator::new(
            Arc::clone(&config),
            Arc::clone(&registry),
            backend,
            Arc::clone(&store),
        );
        Self {
            config,
            registry,
            store,
            generator,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CircuitRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<ProofStore> {
        &self.store
    }

    pub async fn generate_proof(&self, request: ProofRequest) -> Result<Proof> {
        self.generator.generate_proof(request).await
    }

    /// Stateless check of any proof, stored here or imported
    pub fn verify_proof(&self, proof: &Proof) -> Result<bool> {
        ProofVerifier::verify_proof(proof)
    }

    /// Verify a stored proof and, if it holds, move it to `verified`
    pub fn verify_stored(&self, id: ProofId) -> Result<bool> {
        let now = Utc::now();
        let proof = self.store.get_at(id, now)?;
        let valid = ProofVerifier::verify_at(&proof, now)?;
        if valid {
            self.store.mark_verified(id, now)?;
        }
        Ok(valid)
    }

    pub fn get_proof_status(&self, id: ProofId) -> Result<ProofStatus> {
        self.store.get_proof_status(id)
    }

    pub fn get_proof(&self, id: ProofId) -> Result<Proof> {
        self.store.get(id)
    }

    pub fn export_proof(&self, id: ProofId, format: ExportFormat) -> Result<String> {
        export::export_proof(&self.store.get(id)?, format)
    }

    pub fn import_proof(&self, json: &str) -> Result<Proof> {
        export::import_json(json)
    }

    pub fn estimate_gas(&self, proof: &Proof) -> u64 {
        export::estimate_gas(proof.proof_system, proof.proof_bytes.len())
    }

    /// The verification key of a circuit, deriving it on first use
    pub fn verification_key(&self, claim_type: ClaimType, proof_system: ProofSystem) -> VerificationKey {
        self.registry
            .circuit(claim_type, proof_system)
            .verification_key
            .clone()
    }

    /// A monitor over `source` using the configured scan interval
    pub fn monitor(
        &self,
        source: Arc<dyn AnnouncementSource>,
    ) -> (ScanMonitor, mpsc::UnboundedReceiver<MonitorEvent>) {
        ScanMonitor::new(source, self.config.scan_interval())
    }

    /// Build a stealth payment to `recipient`, optionally backed by a balance
    /// proof generated from `funding`
    pub async fn private_transfer(
        &self,
        recipient: &MetaAddress,
        amount: Option<u64>,
        funding: Option<ProofRequest>,
    ) -> Result<PrivateTransfer> {
        let balance_proof = match funding {
            Some(request) if request.claim_type != ClaimType::Balance => {
                return Err(VeilError::Validation(ValidationError {
                    claim_type: request.claim_type,
                    issues: vec![FieldIssue {
                        scope: FieldScope::Claim,
                        field: "type".into(),
                        kind: IssueKind::Malformed("a balance claim"),
                    }],
                }));
            }
            Some(request) => Some(self.generate_proof(request).await?),
            None => None,
        };

        let announcement = prepare_payment(recipient, amount)?;
        tracing::info!(
            stealth_address = %announcement.stealth_address,
            with_amount = amount.is_some(),
            with_balance_proof = balance_proof.is_some(),
            "prepared private transfer"
        );
        Ok(PrivateTransfer {
            announcement,
            balance_proof,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::StealthAddress;

    fn balance_request() -> ProofRequest {
        ProofRequest::new(ClaimType::Balance)
            .with_claim("minBalance", "10.0")
            .with_claim("token", "ETH")
            .with_private_input("address", "0xabc")
            .with_private_input("signature", "0xsig")
            .with_private_input("actualBalance", "12.5")
    }

    #[tokio::test]
    async fn test_verify_stored_marks_verified() {
        let engine = Engine::with_reference_prover(EngineConfig::default());
        let proof = engine.generate_proof(balance_request()).await.unwrap();
        assert_eq!(engine.get_proof_status(proof.id).unwrap(), ProofStatus::Ready);

        assert!(engine.verify_stored(proof.id).unwrap());
        assert_eq!(engine.get_proof_status(proof.id).unwrap(), ProofStatus::Verified);
        // Idempotent
        assert!(engine.verify_stored(proof.id).unwrap());
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let engine = Engine::with_reference_prover(EngineConfig::default());
        let id = ProofId::new();
        assert!(matches!(engine.get_proof(id), Err(VeilError::ProofNotFound(_))));
        assert!(matches!(engine.verify_stored(id), Err(VeilError::ProofNotFound(_))));
        assert!(matches!(
            engine.export_proof(id, ExportFormat::Json),
            Err(VeilError::ProofNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_export_and_gas() {
        let engine = Engine::with_reference_prover(EngineConfig::default());
        let proof = engine.generate_proof(balance_request()).await.unwrap();

        let json = engine.export_proof(proof.id, ExportFormat::Json).unwrap();
        assert_eq!(engine.import_proof(&json).unwrap(), proof);
        assert_eq!(engine.estimate_gas(&proof), 195_000 + 16 * 256);
        assert_eq!(
            engine.verification_key(ClaimType::Balance, ProofSystem::Groth16),
            proof.verification_key
        );
    }

    #[tokio::test]
    async fn test_private_transfer_with_balance_proof() {
        let engine = Engine::with_reference_prover(EngineConfig::default());
        let recipient = StealthAddress::generate();

        let transfer = engine
            .private_transfer(&recipient.address, Some(7), Some(balance_request()))
            .await
            .unwrap();
        let proof = transfer.balance_proof.as_ref().unwrap();
        assert!(engine.verify_proof(proof).unwrap());

        let found = recipient.scan(&[transfer.announcement]).unwrap();
        assert_eq!(found[0].amount, Some(7));
    }

    #[tokio::test]
    async fn test_private_transfer_rejects_non_balance_funding() {
        let engine = Engine::with_reference_prover(EngineConfig::default());
        let recipient = StealthAddress::generate();
        let funding = ProofRequest::new(ClaimType::Ownership).with_claim("asset", "x");

        let err = engine
            .private_transfer(&recipient.address, Some(1), Some(funding))
            .await
            .unwrap_err();
        match err {
            VeilError::Validation(err) => assert_eq!(err.fields(), vec!["claim.type".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(engine.store().is_empty());
    }
}
