//! Proof lifecycle store
//!
//! ```text
//! pending ──► ready ──► verified
//!    │          │           │
//!    ▼          └─────┬─────┘
//! failed              ▼
//!             expired (read time only)
//! ```
//!
//! Expiry is never written back. It is applied to the status each time a
//! slot is read, so a proof that was `ready` an hour ago reads as `expired`
//! now without any sweeper.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::{Result, VeilError};
use crate::types::{Proof, ProofId, ProofStatus};

#[derive(Debug, Clone)]
struct Slot {
    status: ProofStatus,
    /// Set once generation completes
    proof: Option<Proof>,
}

impl Slot {
    fn effective_status(&self, now: DateTime<Utc>) -> ProofStatus {
        match (&self.proof, self.status) {
            (Some(proof), ProofStatus::Ready | ProofStatus::Verified) if proof.is_expired_at(now) => {
                ProofStatus::Expired
            }
            (_, status) => status,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProofStore {
    slots: RwLock<HashMap<ProofId, Slot>>,
}

impl ProofStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a pending slot for a generation that is about to start
    pub fn reserve(&self) -> ProofId {
        let id = ProofId::new();
        self.slots.write().insert(
            id,
            Slot {
                status: ProofStatus::Pending,
                proof: None,
            },
        );
        tracing::debug!(proof_id = %id, "reserved proof slot");
        id
    }

    /// `pending -> ready`
    pub fn complete(&self, id: ProofId, mut proof: Proof) -> Result<()> {
        let mut slots = self.slots.write();
        let slot = slots.get_mut(&id).ok_or(VeilError::ProofNotFound(id))?;
        if slot.status != ProofStatus::Pending || proof.id != id {
            return Err(VeilError::InvalidTransition {
                id,
                from: slot.status,
                to: ProofStatus::Ready,
            });
        }
        proof.status = ProofStatus::Ready;
        slot.status = ProofStatus::Ready;
        slot.proof = Some(proof);
        tracing::debug!(proof_id = %id, "proof ready");
        Ok(())
    }

    /// `pending -> failed`
    pub fn fail(&self, id: ProofId) -> Result<()> {
        let mut slots = self.slots.write();
        let slot = slots.get_mut(&id).ok_or(VeilError::ProofNotFound(id))?;
        if slot.status != ProofStatus::Pending {
            return Err(VeilError::InvalidTransition {
                id,
                from: slot.status,
                to: ProofStatus::Failed,
            });
        }
        slot.status = ProofStatus::Failed;
        tracing::debug!(proof_id = %id, "proof generation failed");
        Ok(())
    }

    /// `ready -> verified`. Verifying twice is a no-op; an expired proof
    /// cannot be marked.
    pub fn mark_verified(&self, id: ProofId, now: DateTime<Utc>) -> Result<()> {
        let mut slots = self.slots.write();
        let slot = slots.get_mut(&id).ok_or(VeilError::ProofNotFound(id))?;
        match slot.effective_status(now) {
            ProofStatus::Ready | ProofStatus::Verified => {
                slot.status = ProofStatus::Verified;
                if let Some(proof) = slot.proof.as_mut() {
                    proof.status = ProofStatus::Verified;
                }
                tracing::debug!(proof_id = %id, "proof verified");
                Ok(())
            }
            from => Err(VeilError::InvalidTransition {
                id,
                from,
                to: ProofStatus::Verified,
            }),
        }
    }

    pub fn status_at(&self, id: ProofId, now: DateTime<Utc>) -> Result<ProofStatus> {
        self.slots
            .read()
            .get(&id)
            .map(|slot| slot.effective_status(now))
            .ok_or(VeilError::ProofNotFound(id))
    }

    pub fn get_proof_status(&self, id: ProofId) -> Result<ProofStatus> {
        self.status_at(id, Utc::now())
    }

    /// The stored proof with the status as of `now`. Slots that never
    /// completed carry no proof and read as not found.
    pub fn get_at(&self, id: ProofId, now: DateTime<Utc>) -> Result<Proof> {
        let slots = self.slots.read();
        let slot = slots.get(&id).ok_or(VeilError::ProofNotFound(id))?;
        let mut proof = slot.proof.clone().ok_or(VeilError::ProofNotFound(id))?;
        proof.status = slot.effective_status(now);
        Ok(proof)
    }

    pub fn get(&self, id: ProofId) -> Result<Proof> {
        self.get_at(id, Utc::now())
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClaimType, ProofSystem};
    use crate::zk::VerificationKey;
    use chrono::Duration;

    fn proof(id: ProofId, expires_at: Option<DateTime<Utc>>) -> Proof {
        Proof {
            id,
            proof_bytes: vec![1, 2, 3],
            public_inputs: vec!["10.0".into(), "ETH".into()],
            verification_key: VerificationKey::new(ProofSystem::Groth16, ClaimType::Balance, vec![9]),
            proof_system: ProofSystem::Groth16,
            claim_type: ClaimType::Balance,
            created_at: Utc::now(),
            expires_at,
            status: ProofStatus::Pending,
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let store = ProofStore::new();
        let id = store.reserve();
        assert_eq!(store.get_proof_status(id).unwrap(), ProofStatus::Pending);
        assert!(matches!(store.get(id), Err(VeilError::ProofNotFound(_))));

        store.complete(id, proof(id, None)).unwrap();
        assert_eq!(store.get(id).unwrap().status, ProofStatus::Ready);

        store.mark_verified(id, Utc::now()).unwrap();
        store.mark_verified(id, Utc::now()).unwrap();
        assert_eq!(store.get_proof_status(id).unwrap(), ProofStatus::Verified);
    }

    #[test]
    fn test_lazy_expiry() {
        let store = ProofStore::new();
        let id = store.reserve();
        let now = Utc::now();
        store.complete(id, proof(id, Some(now + Duration::minutes(5)))).unwrap();

        assert_eq!(store.status_at(id, now).unwrap(), ProofStatus::Ready);
        let later = now + Duration::minutes(6);
        assert_eq!(store.status_at(id, later).unwrap(), ProofStatus::Expired);
        assert_eq!(store.get_at(id, later).unwrap().status, ProofStatus::Expired);

        // Not written back
        assert_eq!(store.status_at(id, now).unwrap(), ProofStatus::Ready);

        assert!(matches!(
            store.mark_verified(id, later),
            Err(VeilError::InvalidTransition {
                from: ProofStatus::Expired,
                ..
            })
        ));
    }

    #[test]
    fn test_failed_is_terminal() {
        let store = ProofStore::new();
        let id = store.reserve();
        store.fail(id).unwrap();

        assert_eq!(store.get_proof_status(id).unwrap(), ProofStatus::Failed);
        assert!(store.complete(id, proof(id, None)).is_err());
        assert!(store.fail(id).is_err());
        assert!(store.mark_verified(id, Utc::now()).is_err());
    }

    #[test]
    fn test_complete_rejects_foreign_proof() {
        let store = ProofStore::new();
        let id = store.reserve();
        let err = store.complete(id, proof(ProofId::new(), None)).unwrap_err();
        assert!(matches!(err, VeilError::InvalidTransition { .. }));
    }

    #[test]
    fn test_unknown_id() {
        let store = ProofStore::new();
        let id = ProofId::new();
        assert!(matches!(store.get_proof_status(id), Err(VeilError::ProofNotFound(_))));
        assert!(matches!(store.fail(id), Err(VeilError::ProofNotFound(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_reservations() {
        let store = std::sync::Arc::new(ProofStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let id = store.reserve();
                        store.complete(id, proof(id, None)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 400);
    }
}
