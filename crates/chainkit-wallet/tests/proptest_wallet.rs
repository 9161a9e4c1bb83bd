use proptest::prelude::*;

use chainkit_primitives::ec::PrivateKey;
use chainkit_primitives::Address;
use chainkit_transaction::{AliasMap, CredentialKind, OutputOwners};
use chainkit_wallet::{MultisigKeyChain, WalletError};

fn key(i: usize) -> PrivateKey {
    PrivateKey::from_bytes(&[i as u8 + 1; 32]).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Resolution succeeds iff at least `threshold` owners signed, and the
    /// chosen indices are the first `threshold` signers in owner order.
    #[test]
    fn multisig_threshold_law(
        n in 1usize..6,
        threshold_seed in any::<u32>(),
        mask in any::<u8>(),
        hash in prop::array::uniform32(any::<u8>()),
    ) {
        let keys: Vec<PrivateKey> = (0..n).map(key).collect();
        let threshold = threshold_seed % n as u32 + 1;
        let owners = OutputOwners::new(keys.iter().map(|k| k.address()).collect(), threshold, 0).unwrap();

        let mut ms = MultisigKeyChain::new(hash, "local", "X", CredentialKind::Secp, vec![owners.clone()], AliasMap::new());
        let signing: Vec<&PrivateKey> = keys.iter().enumerate().filter(|(i, _)| mask & (1 << i) != 0).map(|(_, k)| k).collect();
        for k in &signing {
            ms.add_signer(k).unwrap();
        }

        let mut expected: Vec<u32> = signing.iter().map(|k| owners.address_index(&k.address()).unwrap()).collect();
        expected.sort_unstable();
        expected.truncate(threshold as usize);

        match ms.build_signature_indices() {
            Ok(resolved) => {
                prop_assert!(signing.len() >= threshold as usize);
                let slot = &resolved.slots()[0];
                prop_assert_eq!(&slot.sig_indices, &expected);
                let expected_signers: Vec<Address> = expected.iter().map(|&i| owners.addresses()[i as usize]).collect();
                prop_assert_eq!(&slot.signers, &expected_signers);
                for (sig, signer) in slot.signatures.iter().zip(&slot.signers) {
                    prop_assert_eq!(sig.recover_address(&hash).unwrap(), *signer);
                }
            }
            Err(WalletError::ThresholdUnsatisfiable { threshold: t, .. }) => {
                prop_assert!(signing.len() < threshold as usize);
                prop_assert_eq!(t, threshold);
            }
            Err(e) => prop_assert!(false, "unexpected error: {e}"),
        }
    }
}
