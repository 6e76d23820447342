//! Property tests for the stealth and amount primitives
//!
//! Properties:
//! - Recovery: the recipient re-derives the sender's one-time address and
//!   the matching spending key
//! - Unlinkability: fresh ephemeral keys give distinct addresses
//! - Wrong recipient rejection: nobody else detects the payment
//! - Amount round trip, failing closed under the wrong key

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use crate::crypto::{
        compute_one_time_address, deobfuscate_amount, obfuscate_amount, EphemeralKeyPair,
        MetaAddress, StealthAddress,
    };
    use crate::error::VeilError;
    use crate::transfer::prepare_payment;

    fn secret_bytes() -> impl Strategy<Value = [u8; 32]> {
        prop::array::uniform32(any::<u8>()).prop_filter("non-zero scalar", |bytes| {
            bytes.iter().any(|&b| b != 0)
        })
    }

    fn recipient() -> impl Strategy<Value = StealthAddress> {
        (secret_bytes(), secret_bytes())
            .prop_filter("distinct secrets", |(v, s)| v != s)
            .prop_filter_map("valid secrets", |(v, s)| StealthAddress::from_secrets(v, s).ok())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_recipient_recovers_address_and_key(recipient in recipient()) {
            let ephemeral = EphemeralKeyPair::generate();
            let address = compute_one_time_address(&recipient.address, &ephemeral).unwrap();

            prop_assert_eq!(recipient.derive_address(&ephemeral.public).unwrap(), address);
            let key = recipient.spending_key_for(&ephemeral.public).unwrap();
            prop_assert_eq!(&key.public_key(), address.as_bytes());
        }

        #[test]
        fn prop_fresh_ephemerals_are_unlinkable(recipient in recipient()) {
            let first = compute_one_time_address(&recipient.address, &EphemeralKeyPair::generate()).unwrap();
            let second = compute_one_time_address(&recipient.address, &EphemeralKeyPair::generate()).unwrap();

            prop_assert_ne!(first, second);
            prop_assert_ne!(first.as_bytes(), &recipient.address.spending_pubkey);
        }

        #[test]
        fn prop_other_recipients_do_not_detect(
            recipient in recipient(),
            other in recipient(),
        ) {
            prop_assume!(recipient.address != other.address);
            let announcement = prepare_payment(&recipient.address, None).unwrap();

            prop_assert!(!other.view_key().owns(&announcement).unwrap());
            prop_assert!(other.scan(std::slice::from_ref(&announcement)).unwrap().is_empty());
            prop_assert_eq!(recipient.scan(&[announcement]).unwrap().len(), 1);
        }

        #[test]
        fn prop_meta_address_text_round_trip(recipient in recipient()) {
            let text = recipient.address.to_string();
            prop_assert!(text.starts_with("stealth:"));
            prop_assert_eq!(text.parse::<MetaAddress>().unwrap(), recipient.address);
        }

        #[test]
        fn prop_amount_opens_only_for_recipient(
            amount in any::<u64>(),
            recipient in recipient(),
            other in recipient(),
        ) {
            prop_assume!(recipient.address != other.address);
            let obfuscated = obfuscate_amount(amount, &recipient.address.viewing_pubkey).unwrap();

            prop_assert_eq!(deobfuscate_amount(&obfuscated, recipient.viewing_key()).unwrap(), amount);
            prop_assert!(matches!(
                deobfuscate_amount(&obfuscated, other.viewing_key()),
                Err(VeilError::CommitmentMismatch)
            ));
        }
    }
}
