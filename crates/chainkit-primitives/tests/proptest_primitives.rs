use proptest::prelude::*;

use chainkit_primitives::addressing::{format_address, parse_address};
use chainkit_primitives::base58::{check_decode, check_encode};
use chainkit_primitives::ec::private_key::PrivateKey;
use chainkit_primitives::ec::signature::Signature;
use chainkit_primitives::hash::sha256;
use chainkit_primitives::hd::HdNode;
use chainkit_primitives::{Address, Id};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cb58_round_trip(data in prop::collection::vec(any::<u8>(), 0..96)) {
        let encoded = check_encode(&data);
        prop_assert_eq!(check_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn cb58_detects_single_byte_corruption(
        data in prop::collection::vec(any::<u8>(), 1..64),
        pos in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let mut raw = data.clone();
        raw.extend_from_slice(&sha256(&sha256(&data))[..4]);
        let i = pos.index(raw.len());
        raw[i] ^= flip;
        let corrupted = chainkit_primitives::base58::encode(&raw);
        prop_assert!(check_decode(&corrupted).is_err());
    }

    #[test]
    fn id_string_round_trip(bytes in prop::array::uniform32(any::<u8>())) {
        let id = Id::new(bytes);
        prop_assert_eq!(id.to_string().parse::<Id>().unwrap(), id);
    }

    #[test]
    fn bech32_address_round_trip(
        bytes in prop::array::uniform20(any::<u8>()),
        alias in "[XPC]",
        hrp in "[a-z]{1,8}",
    ) {
        let address = Address::new(bytes);
        let s = format_address(&alias, &hrp, &address).unwrap();
        let parsed = parse_address(&s).unwrap();
        prop_assert_eq!(parsed.chain_alias, alias);
        prop_assert_eq!(parsed.hrp, hrp);
        prop_assert_eq!(parsed.address, address);
    }

    #[test]
    fn sign_recovers_signer(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        // Not every 32-byte array is a valid scalar.
        if let Ok(key) = PrivateKey::from_bytes(&seed) {
            let hash = sha256(&msg);
            let sig = key.sign(&hash).unwrap();
            prop_assert!(key.pub_key().verify(&hash, &sig));
            let parsed = Signature::from_bytes(&sig.to_bytes()).unwrap();
            prop_assert_eq!(parsed.recover_address(&hash).unwrap(), key.address());
        }
    }

    #[test]
    fn private_key_string_round_trip(seed in prop::array::uniform32(any::<u8>())) {
        if let Ok(key) = PrivateKey::from_bytes(&seed) {
            let encoded = key.to_cb58_string();
            prop_assert_eq!(PrivateKey::from_cb58_string(&encoded).unwrap(), key);
        }
    }

    #[test]
    fn hd_public_derivation_agrees(
        seed in prop::collection::vec(any::<u8>(), 16..=64),
        index in 0u32..1000,
    ) {
        let account = HdNode::from_seed(&seed).unwrap().derive("m/44'/9000'/0'").unwrap();
        let private_child = account.derive_child(index).unwrap();
        let public_child = account.neuter().derive_child(index).unwrap();
        prop_assert_eq!(private_child.address(), public_child.address());
    }
}
