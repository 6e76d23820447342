//! Private transfer composition
//!
//! A private transfer pays a recipient's meta-address at a fresh one-time
//! address, hides the amount, and optionally carries a balance proof that the
//! sender can cover it.

use serde::{Deserialize, Serialize};

use crate::crypto::{
    compute_one_time_address, obfuscate_amount, Announcement, EphemeralKeyPair, MetaAddress,
};
use crate::error::Result;
use crate::types::Proof;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateTransfer {
    pub announcement: Announcement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_proof: Option<Proof>,
}

/// Build the announcement for one payment. The ephemeral secret is dropped
/// (and wiped) before this returns. `sequence` is assigned by the source the
/// announcement is published to.
pub fn prepare_payment(recipient: &MetaAddress, amount: Option<u64>) -> Result<Announcement> {
    let ephemeral = EphemeralKeyPair::generate();
    let stealth_address = compute_one_time_address(recipient, &ephemeral)?;
    let amount = amount
        .map(|value| obfuscate_amount(value, &recipient.viewing_pubkey))
        .transpose()?;

    tracing::debug!(stealth_address = %stealth_address, "prepared stealth payment");
    Ok(Announcement {
        sequence: 0,
        ephemeral_pubkey: ephemeral.public,
        stealth_address,
        amount,
    })
}
