//! Property-based tests for address derivation.
//!
//! Collision-freedom and format stability are what keep independent nodes
//! byte-identical, so these invariants are checked across generated key
//! material rather than a handful of fixtures — including keys that differ by
//! a single bit.

use proptest::prelude::*;
use supply_ledger::addressing::{
    self, ADDRESS_LEN, AddressKind, batch_address, company_address, company_admin_address,
    field_address, is_valid_address, operator_address,
};

/// Random compressed-point-shaped public key: "02" plus 64 hex characters.
fn key_strategy() -> impl Strategy<Value = String> {
    any::<[u8; 32]>().prop_map(|bytes| format!("02{}", hex::encode(bytes)))
}

fn id_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9-]{1,24}"
}

proptest! {
    /// Every derived address is well-formed and derivation is a pure
    /// function of its input.
    #[test]
    fn prop_derived_addresses_are_stable_and_well_formed(key in key_strategy(), id in id_strategy()) {
        let derived = [
            company_admin_address(&key),
            operator_address(&key),
            company_address(&id),
            batch_address(&id),
            field_address(&id, &id),
        ];
        for address in &derived {
            prop_assert_eq!(address.len(), ADDRESS_LEN);
            prop_assert!(is_valid_address(address), "malformed: {}", address);
        }
        prop_assert_eq!(&company_admin_address(&key), &derived[0]);
        prop_assert_eq!(&batch_address(&id), &derived[3]);
    }

    /// Distinct keys never share an address (up to hash collision odds).
    #[test]
    fn prop_distinct_keys_produce_distinct_addresses(
        a in any::<[u8; 32]>(),
        b in any::<[u8; 32]>(),
    ) {
        prop_assume!(a != b);
        let key_a = format!("02{}", hex::encode(a));
        let key_b = format!("02{}", hex::encode(b));
        prop_assert_ne!(company_admin_address(&key_a), company_admin_address(&key_b));
        prop_assert_ne!(operator_address(&key_a), operator_address(&key_b));
    }

    /// A single flipped bit in the key material moves the address.
    #[test]
    fn prop_one_bit_difference_changes_the_address(
        bytes in any::<[u8; 32]>(),
        byte_index in 0usize..32,
        bit in 0u8..8,
    ) {
        let mut flipped = bytes;
        flipped[byte_index] ^= 1 << bit;

        let key = format!("02{}", hex::encode(bytes));
        let key_flipped = format!("02{}", hex::encode(flipped));
        prop_assert_ne!(operator_address(&key), operator_address(&key_flipped));
    }

    /// The composite field address separates both halves: changing either
    /// the field id or the owning company id moves the address.
    #[test]
    fn prop_field_address_halves_are_independent(
        id_a in id_strategy(),
        id_b in id_strategy(),
        company_a in id_strategy(),
        company_b in id_strategy(),
    ) {
        if id_a != id_b {
            prop_assert_ne!(
                field_address(&id_a, &company_a),
                field_address(&id_b, &company_a)
            );
        }
        if company_a != company_b {
            prop_assert_ne!(
                field_address(&id_a, &company_a),
                field_address(&id_a, &company_b)
            );
        }
    }

    /// Kind prefixes partition the address space: the same key material under
    /// different kinds never collides, and each address reports its kind.
    #[test]
    fn prop_kind_prefixes_partition_addresses(key in key_strategy()) {
        let admin = company_admin_address(&key);
        let operator = operator_address(&key);
        prop_assert_ne!(&admin, &operator);
        prop_assert!(admin.starts_with(AddressKind::CompanyAdmin.prefix()));
        prop_assert!(operator.starts_with(AddressKind::Operator.prefix()));
    }
}

#[cfg(test)]
mod extensive_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        /// The truncated-digest id derivation behind company ids is stable
        /// and collision-free across many keys.
        #[test]
        fn prop_company_id_derivation_is_stable(
            a in any::<[u8; 32]>(),
            b in any::<[u8; 32]>(),
        ) {
            prop_assume!(a != b);
            let key_a = format!("02{}", hex::encode(a));
            let key_b = format!("02{}", hex::encode(b));

            let id_a = addressing::hash_and_slice(&key_a, 10);
            prop_assert_eq!(&id_a, &addressing::hash_and_slice(&key_a, 10));
            prop_assert_eq!(id_a.len(), 10);
            // 40 bits of digest: collisions between two generated keys are
            // beyond proptest's reach.
            prop_assert_ne!(id_a, addressing::hash_and_slice(&key_b, 10));

            prop_assert_ne!(
                company_address(&addressing::hash_and_slice(&key_a, 10)),
                company_address(&addressing::hash_and_slice(&key_b, 10))
            );
        }
    }
}
