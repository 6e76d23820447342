//! Proof generation pipeline
//!
//! validate → reserve slot → build witness → adapter/backend (retried) →
//! store as `ready`. Any failure after the slot is reserved leaves it `failed`.

use std::sync::Arc;

use chrono::Utc;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::prover::ProverBackend;
use crate::retry::{retry_transient, timeout_error};
use crate::store::ProofStore;
use crate::types::{Proof, ProofRequest, ProofStatus};
use crate::validator::{RequestValidator, ValidatedRequest};
use crate::witness::WitnessBuilder;
use crate::zk::{Adapter, Circuit, CircuitRegistry, GeneratedProof};

pub struct ProofGenerator {
    config: Arc<EngineConfig>,
    registry: Arc<CircuitRegistry>,
    backend: Arc<dyn ProverBackend>,
    store: Arc<ProofStore>,
}

impl ProofGenerator {
    pub fn new(
        config: Arc<EngineConfig>,
        registry: Arc<CircuitRegistry>,
        backend: Arc<dyn ProverBackend>,
        store: Arc<ProofStore>,
    ) -> Self {
        Self {
            config,
            registry,
            backend,
            store,
        }
    }

    pub async fn generate_proof(&self, request: ProofRequest) -> Result<Proof> {
        let validated = RequestValidator::validate(request)?;
        let claim_type = validated.claim_type();
        let system = validated
            .proof_system()
            .unwrap_or(self.config.default_proof_system);
        let circuit = self.registry.circuit(claim_type, system);

        let id = self.store.reserve();
        tracing::info!(
            proof_id = %id,
            claim_type = %claim_type,
            proof_system = %system,
            circuit_id = %circuit.id,
            "generating proof"
        );

        let generated = match self.run(&validated, &circuit).await {
            Ok(generated) => generated,
            Err(err) => {
                tracing::warn!(proof_id = %id, "proof generation failed: {err}");
                if let Err(store_err) = self.store.fail(id) {
                    tracing::error!(proof_id = %id, "could not mark proof failed: {store_err}");
                }
                return Err(err);
            }
        };

        let created_at = Utc::now();
        let expires_at = self
            .config
            .ttl
            .ttl_for(claim_type)
            .and_then(|ttl| created_at.checked_add_signed(ttl));

        let proof = Proof {
            id,
            proof_bytes: generated.proof_bytes,
            public_inputs: generated.public_inputs,
            verification_key: generated.verification_key,
            proof_system: system,
            claim_type,
            created_at,
            expires_at,
            status: ProofStatus::Ready,
        };
        self.store.complete(id, proof.clone())?;

        tracing::info!(
            proof_id = %id,
            proof_bytes = proof.proof_bytes.len(),
            "proof ready"
        );
        Ok(proof)
    }

    /// Witness lives only inside this call and is wiped when it returns
    async fn run(&self, validated: &ValidatedRequest, circuit: &Circuit) -> Result<GeneratedProof> {
        let witness = WitnessBuilder::build(validated, circuit)?;
        let adapter = Adapter::for_system(circuit.proof_system);
        let backend = self.backend.as_ref();
        let limit = self.config.backend_timeout();

        retry_transient(&self.config.retry, |attempt| {
            let witness = &witness;
            async move {
                tracing::debug!(circuit_id = %circuit.id, attempt, "calling prover backend");
                tokio::time::timeout(limit, adapter.generate(backend, circuit, witness))
                    .await
                    .map_err(|_| timeout_error(limit))?
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VeilError;
    use crate::prover::ReferenceProver;
    use crate::types::{ClaimType, ProofSystem};

    fn generator(config: EngineConfig) -> (ProofGenerator, Arc<ProofStore>) {
        let registry = Arc::new(CircuitRegistry::new());
        let store = Arc::new(ProofStore::new());
        let backend = Arc::new(ReferenceProver::new(Arc::clone(&registry)));
        (
            ProofGenerator::new(Arc::new(config), registry, backend, Arc::clone(&store)),
            store,
        )
    }

    fn ownership() -> ProofRequest {
        ProofRequest::new(ClaimType::Ownership)
            .with_claim("assetId", "42")
            .with_claim("collection", "0xc0ffee")
            .with_private_input("address", "0xabc")
            .with_private_input("signature", "0xsig")
    }

    #[tokio::test]
    async fn test_default_system_and_ttl() {
        let (generator, store) = generator(EngineConfig::default());
        let proof = generator.generate_proof(ownership()).await.unwrap();

        assert_eq!(proof.proof_system, ProofSystem::Groth16);
        assert_eq!(proof.status, ProofStatus::Ready);
        assert_eq!(
            proof.expires_at.unwrap() - proof.created_at,
            chrono::Duration::hours(24)
        );
        assert_eq!(store.get(proof.id).unwrap(), proof);
    }

    #[tokio::test]
    async fn test_configured_default_system() {
        let config = EngineConfig {
            default_proof_system: ProofSystem::Stark,
            ..EngineConfig::default()
        };
        let (generator, _) = generator(config);
        let proof = generator.generate_proof(ownership()).await.unwrap();
        assert_eq!(proof.proof_system, ProofSystem::Stark);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_expires() {
        let mut config = EngineConfig::default();
        config.ttl.ownership_secs = 0;
        let (generator, _) = generator(config);
        let proof = generator.generate_proof(ownership()).await.unwrap();
        assert!(proof.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_validation_failure_reserves_nothing() {
        let (generator, store) = generator(EngineConfig::default());
        let request = ProofRequest::new(ClaimType::Ownership).with_claim("assetId", "42");

        let err = generator.generate_proof(request).await.unwrap_err();
        assert!(matches!(err, VeilError::Validation(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_system_is_rejected() {
        let (generator, store) = generator(EngineConfig::default());
        let err = generator
            .generate_proof(ownership().with_proof_system("bulletproofs"))
            .await
            .unwrap_err();
        assert!(matches!(err, VeilError::UnsupportedProofSystem(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_constraint_violation_marks_slot_failed() {
        let (generator, store) = generator(EngineConfig::default());
        let request = ProofRequest::new(ClaimType::Balance)
            .with_claim("minBalance", "100")
            .with_claim("token", "ETH")
            .with_private_input("address", "0xabc")
            .with_private_input("signature", "0xsig")
            .with_private_input("actualBalance", "1");

        let err = generator.generate_proof(request).await.unwrap_err();
        assert!(matches!(err, VeilError::ConstraintViolation));
        assert_eq!(store.len(), 1);
    }
}
