//! End-to-end tests for the Veil engine
//!
//! These run whole flows through [`Engine`]:
//! - request → proof → verify → export → import
//! - backend retries and failure classification
//! - expiry of stored and exported proofs
//! - stealth payments through the scan monitor

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::config::EngineConfig;
    use crate::crypto::StealthAddress;
    use crate::error::{Result, VeilError};
    use crate::export::{self, ExportFormat};
    use crate::monitor::MemoryAnnouncementSource;
    use crate::prover::{BackendProof, ProverBackend, ReferenceProver};
    use crate::retry::RetryPolicy;
    use crate::types::{ClaimType, ProofRequest, ProofStatus, ProofSystem};
    use crate::verifier::ProofVerifier;
    use crate::witness::Witness;
    use crate::zk::{CircuitId, CircuitRegistry};
    use crate::Engine;

    const SECRET_ADDRESS: &str = "0xdeadbeefcafe1234";
    const SECRET_SIGNATURE: &str = "sig-never-leaves-the-witness";
    const SECRET_BALANCE: &str = "12345.678";

    fn balance_request() -> ProofRequest {
        ProofRequest::new(ClaimType::Balance)
            .with_claim("minBalance", "10.0")
            .with_claim("token", "ETH")
            .with_private_input("address", SECRET_ADDRESS)
            .with_private_input("signature", SECRET_SIGNATURE)
            .with_private_input("actualBalance", SECRET_BALANCE)
    }

    fn fast_retries() -> EngineConfig {
        EngineConfig {
            retry: RetryPolicy {
                initial_delay_ms: 1,
                max_delay_ms: 5,
                ..RetryPolicy::default()
            },
            ..EngineConfig::default()
        }
    }

    /// Fails the first `failures` calls with `error`, then defers to the
    /// reference prover
    struct FlakyBackend {
        inner: ReferenceProver,
        failures: u32,
        error: fn() -> VeilError,
        calls: AtomicU32,
    }

    impl FlakyBackend {
        fn new(registry: Arc<CircuitRegistry>, failures: u32, error: fn() -> VeilError) -> Self {
            Self {
                inner: ReferenceProver::new(registry),
                failures,
                error,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ProverBackend for FlakyBackend {
        async fn prove(&self, circuit_id: &CircuitId, witness: &Witness) -> Result<BackendProof> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err((self.error)());
            }
            self.inner.prove(circuit_id, witness).await
        }
    }

    // ==================== Proof lifecycle ====================

    #[tokio::test]
    async fn test_balance_scenario() {
        let engine = Engine::with_reference_prover(EngineConfig::default());
        let proof = engine.generate_proof(balance_request()).await.unwrap();

        assert_eq!(proof.public_inputs, vec!["10.0".to_string(), "ETH".to_string()]);
        assert_eq!(proof.proof_system, ProofSystem::Groth16);
        assert_eq!(proof.proof_system.to_string(), "groth16");
        assert!(engine.verify_proof(&proof).unwrap());

        let json = engine.export_proof(proof.id, ExportFormat::Json).unwrap();
        assert_eq!(engine.import_proof(&json).unwrap(), proof);
    }

    #[tokio::test]
    async fn test_every_system_verifies_before_expiry() {
        let engine = Engine::with_reference_prover(EngineConfig::default());
        for system in ProofSystem::ALL {
            let request = balance_request().with_proof_system(system.as_str());
            let proof = engine.generate_proof(request).await.unwrap();

            assert_eq!(proof.proof_system, system);
            assert!(engine.verify_proof(&proof).unwrap(), "{system} proof rejected");
            assert!(engine.verify_stored(proof.id).unwrap());
            assert_eq!(engine.get_proof_status(proof.id).unwrap(), ProofStatus::Verified);
        }
        assert_eq!(engine.store().len(), 3);
    }

    #[tokio::test]
    async fn test_exports_never_contain_private_inputs() {
        let engine = Engine::with_reference_prover(EngineConfig::default());
        for system in ProofSystem::ALL {
            let request = balance_request().with_proof_system(system.as_str());
            let proof = engine.generate_proof(request).await.unwrap();

            let exports = [
                engine.export_proof(proof.id, ExportFormat::Json).unwrap(),
                engine.export_proof(proof.id, ExportFormat::Calldata).unwrap(),
                format!("{proof:?}"),
            ];
            for exported in &exports {
                for secret in [SECRET_ADDRESS, SECRET_SIGNATURE, SECRET_BALANCE] {
                    assert!(
                        !exported.contains(secret),
                        "{system} export leaks a private input"
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn test_tampered_public_inputs_fail_verification() {
        let engine = Engine::with_reference_prover(EngineConfig::default());
        for system in ProofSystem::ALL {
            let request = balance_request().with_proof_system(system.as_str());
            let mut proof = engine.generate_proof(request).await.unwrap();
            proof.public_inputs[0] = "1000000.0".to_string();
            assert!(!engine.verify_proof(&proof).unwrap(), "{system} accepted forged inputs");
        }
    }

    #[tokio::test]
    async fn test_expired_proof_is_rejected_with_valid_bytes() {
        let engine = Engine::with_reference_prover(EngineConfig::default());
        let proof = engine.generate_proof(balance_request()).await.unwrap();
        let expires_at = proof.expires_at.unwrap();
        assert_eq!(expires_at - proof.created_at, chrono::Duration::hours(1));

        // Exactly at the boundary the proof is still live
        assert!(ProofVerifier::verify_at(&proof, expires_at).unwrap());

        let later = expires_at + chrono::Duration::seconds(1);
        assert!(matches!(
            ProofVerifier::verify_at(&proof, later),
            Err(VeilError::ProofExpired { id, .. }) if id == proof.id
        ));
        assert_eq!(engine.store().status_at(proof.id, later).unwrap(), ProofStatus::Expired);
        assert!(engine.store().mark_verified(proof.id, later).is_err());

        // An imported copy expires the same way
        let json = export::export_json(&proof).unwrap();
        let imported = export::import_json(&json).unwrap();
        assert!(matches!(
            ProofVerifier::verify_at(&imported, later),
            Err(VeilError::ProofExpired { .. })
        ));
        assert!(ProofVerifier::verify_at(&imported, Utc::now()).unwrap());
    }

    // ==================== Backend failures ====================

    #[tokio::test]
    async fn test_two_transient_failures_then_success() {
        let registry = Arc::new(CircuitRegistry::new());
        let backend = Arc::new(FlakyBackend::new(Arc::clone(&registry), 2, || {
            VeilError::ProverBackend("connection reset".into())
        }));
        let engine = Engine::with_registry(fast_retries(), registry, backend.clone());

        let proof = engine.generate_proof(balance_request()).await.unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert!(engine.verify_proof(&proof).unwrap());
    }

    #[tokio::test]
    async fn test_transient_failures_exhaust_after_three_attempts() {
        let registry = Arc::new(CircuitRegistry::new());
        let backend = Arc::new(FlakyBackend::new(Arc::clone(&registry), u32::MAX, || {
            VeilError::ProverBackend("unavailable".into())
        }));
        let engine = Engine::with_registry(fast_retries(), registry, backend.clone());

        let err = engine.generate_proof(balance_request()).await.unwrap_err();
        assert!(matches!(err, VeilError::ProverBackend(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn test_constraint_violation_is_not_retried() {
        let registry = Arc::new(CircuitRegistry::new());
        let backend = Arc::new(FlakyBackend::new(Arc::clone(&registry), u32::MAX, || {
            VeilError::ConstraintViolation
        }));
        let engine = Engine::with_registry(fast_retries(), registry, backend.clone());

        let err = engine.generate_proof(balance_request()).await.unwrap_err();
        assert!(matches!(err, VeilError::ConstraintViolation));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_insufficient_balance_fails_once() {
        let engine = Engine::with_reference_prover(fast_retries());
        let request = ProofRequest::new(ClaimType::Balance)
            .with_claim("minBalance", "10.0")
            .with_claim("token", "ETH")
            .with_private_input("address", "0xabc")
            .with_private_input("signature", "0xsig")
            .with_private_input("actualBalance", "9.99");

        let err = engine.generate_proof(request).await.unwrap_err();
        assert!(matches!(err, VeilError::ConstraintViolation));
    }

    // ==================== Stealth payments ====================

    #[tokio::test]
    async fn test_private_transfer_through_monitor() {
        let engine = Engine::with_reference_prover(EngineConfig {
            scan_interval_ms: 3_600_000,
            ..EngineConfig::default()
        });
        let alice = StealthAddress::generate();
        let bob = StealthAddress::generate();

        let source = Arc::new(MemoryAnnouncementSource::new());
        for (recipient, amount) in [(&alice, 100), (&bob, 200), (&alice, 300)] {
            let transfer = engine
                .private_transfer(&recipient.address, Some(amount), None)
                .await
                .unwrap();
            source.publish(transfer.announcement);
        }

        let (monitor, mut events) = engine.monitor(source.clone());
        let meta = monitor.start_monitoring(alice.view_key());

        let first = events.recv().await.unwrap();
        let second = events.recv().await.unwrap();
        assert_eq!((first.payment.sequence, first.payment.amount), (0, Some(100)));
        assert_eq!((second.payment.sequence, second.payment.amount), (2, Some(300)));

        // Alice can spend what she found
        let key = alice
            .spending_key_for(&first.payment.ephemeral_pubkey)
            .unwrap();
        assert_eq!(&key.public_key(), first.payment.address.as_bytes());

        assert!(monitor.stop_monitoring(&meta).await);
        let transfer = engine
            .private_transfer(&alice.address, Some(400), None)
            .await
            .unwrap();
        source.publish(transfer.announcement);
        assert_eq!(monitor.trigger_scan(&meta).await.unwrap(), None);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(events.try_recv().is_err());
    }
}
