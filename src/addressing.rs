//! Deterministic ledger address derivation.
//!
//! Every address is exactly [`ADDRESS_LEN`] hex characters:
//! a 6-character namespace, a 2-character entity-kind prefix and a 62-character
//! suffix. User and type kinds spend the first two suffix characters on a
//! sub-prefix, leaving a 60-character truncated digest; companies and batches
//! use the full 62 characters; fields concatenate two truncated digests
//! (42 for the field id, 20 for the owning company id) so distinct
//! (id, company) pairs cannot collide by construction.
//!
//! Derivation is total: any input maps to exactly one well-formed address.

use sha2::{Digest, Sha512};

/// Namespace reserved for this transaction family, the first six hex
/// characters of SHA-512("supply-ledger").
pub const NAMESPACE: &str = "0badb4";

/// Total address length in hex characters.
pub const ADDRESS_LEN: usize = 70;

/// Seed hashed into the well-known system-admin singleton slot.
const SYSTEM_ADMIN_SEED: &str = "system-admin";

/// Entity kinds addressable on the ledger, each carrying its full address
/// prefix (namespace included).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    SystemAdmin,
    CompanyAdmin,
    Operator,
    CertificationAuthority,
    TaskType,
    ProductType,
    PropertyType,
    Company,
    Field,
    Batch,
}

impl AddressKind {
    /// The full hex prefix every address of this kind starts with.
    pub const fn prefix(self) -> &'static str {
        match self {
            AddressKind::SystemAdmin => "0badb40020",
            AddressKind::CompanyAdmin => "0badb40021",
            AddressKind::Operator => "0badb40022",
            AddressKind::CertificationAuthority => "0badb40023",
            AddressKind::TaskType => "0badb40110",
            AddressKind::ProductType => "0badb40111",
            AddressKind::PropertyType => "0badb40114",
            AddressKind::Company => "0badb402",
            AddressKind::Field => "0badb403",
            AddressKind::Batch => "0badb404",
        }
    }

    /// Human-readable kind name used in rejection reasons.
    pub const fn describe(self) -> &'static str {
        match self {
            AddressKind::SystemAdmin => "System Admin",
            AddressKind::CompanyAdmin => "Company Admin",
            AddressKind::Operator => "Operator",
            AddressKind::CertificationAuthority => "Certification Authority",
            AddressKind::TaskType => "Task Type",
            AddressKind::ProductType => "Product Type",
            AddressKind::PropertyType => "Property Type",
            AddressKind::Company => "Company",
            AddressKind::Field => "Field",
            AddressKind::Batch => "Batch",
        }
    }
}

/// Hex-encoded SHA-512 of `data`, truncated to `len` characters.
pub fn hash_and_slice(data: &str, len: usize) -> String {
    let digest = Sha512::digest(data.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(len);
    hex
}

/// Well-known address of the singleton SystemAdmin record.
pub fn system_admin_address() -> String {
    format!(
        "{}{}",
        AddressKind::SystemAdmin.prefix(),
        hash_and_slice(SYSTEM_ADMIN_SEED, 60)
    )
}

/// Address of the CompanyAdmin record for a public key.
pub fn company_admin_address(public_key: &str) -> String {
    format!(
        "{}{}",
        AddressKind::CompanyAdmin.prefix(),
        hash_and_slice(public_key, 60)
    )
}

/// Address of the Operator record for a public key.
pub fn operator_address(public_key: &str) -> String {
    format!(
        "{}{}",
        AddressKind::Operator.prefix(),
        hash_and_slice(public_key, 60)
    )
}

/// Address of the CertificationAuthority record for a public key.
pub fn certification_authority_address(public_key: &str) -> String {
    format!(
        "{}{}",
        AddressKind::CertificationAuthority.prefix(),
        hash_and_slice(public_key, 60)
    )
}

/// Address of a TaskType by id.
pub fn task_type_address(id: &str) -> String {
    format!("{}{}", AddressKind::TaskType.prefix(), hash_and_slice(id, 60))
}

/// Address of a ProductType by id.
pub fn product_type_address(id: &str) -> String {
    format!(
        "{}{}",
        AddressKind::ProductType.prefix(),
        hash_and_slice(id, 60)
    )
}

/// Address of a PropertyType by id.
pub fn property_type_address(id: &str) -> String {
    format!(
        "{}{}",
        AddressKind::PropertyType.prefix(),
        hash_and_slice(id, 60)
    )
}

/// Address of a Company by id.
pub fn company_address(id: &str) -> String {
    format!("{}{}", AddressKind::Company.prefix(), hash_and_slice(id, 62))
}

/// Address of a Field. Composite key: the field id is unique within the
/// owning company's namespace, not globally, so both halves contribute a
/// separately truncated digest.
pub fn field_address(id: &str, company_id: &str) -> String {
    format!(
        "{}{}{}",
        AddressKind::Field.prefix(),
        hash_and_slice(id, 42),
        hash_and_slice(company_id, 20)
    )
}

/// Address of a Batch by id.
pub fn batch_address(id: &str) -> String {
    format!("{}{}", AddressKind::Batch.prefix(), hash_and_slice(id, 62))
}

/// Whether `address` is well-formed: namespace, fixed length, hex only.
/// An address failing this check is never dereferenced.
pub fn is_valid_address(address: &str) -> bool {
    address.len() == ADDRESS_LEN
        && address.starts_with(NAMESPACE)
        && address[NAMESPACE.len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "02a0be5a1c4c19ba3691a4959cb0dcb7123e6bbcfd23a3e164f2a8acda3eb9ad95";

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(company_admin_address(KEY), company_admin_address(KEY));
        assert_eq!(batch_address("batch-1"), batch_address("batch-1"));
    }

    #[test]
    fn all_derived_addresses_are_well_formed() {
        let addresses = [
            system_admin_address(),
            company_admin_address(KEY),
            operator_address(KEY),
            certification_authority_address(KEY),
            task_type_address("task-1"),
            product_type_address("prd-1"),
            property_type_address("prp-1"),
            company_address("6b1b6a2d88"),
            field_address("field-1", "6b1b6a2d88"),
            batch_address("batch-1"),
        ];
        for address in addresses {
            assert!(is_valid_address(&address), "malformed: {address}");
        }
    }

    #[test]
    fn kinds_never_share_an_address_for_the_same_key_material() {
        let derived = [
            company_admin_address(KEY),
            operator_address(KEY),
            certification_authority_address(KEY),
        ];
        assert_ne!(derived[0], derived[1]);
        assert_ne!(derived[1], derived[2]);
        assert_ne!(derived[0], derived[2]);
    }

    #[test]
    fn field_address_depends_on_both_halves() {
        let base = field_address("field-1", "companyA");
        assert_ne!(base, field_address("field-2", "companyA"));
        assert_ne!(base, field_address("field-1", "companyB"));
    }

    #[test]
    fn validity_check_rejects_bad_addresses() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("0badb4"));
        // wrong namespace
        assert!(!is_valid_address(&format!("ffffff{}", "0".repeat(64))));
        // non-hex tail
        assert!(!is_valid_address(&format!("0badb4{}", "z".repeat(64))));
        // one char short
        let mut short = batch_address("batch-1");
        short.pop();
        assert!(!is_valid_address(&short));
    }

    #[test]
    fn prefixes_are_distinct_and_namespaced() {
        let kinds = [
            AddressKind::SystemAdmin,
            AddressKind::CompanyAdmin,
            AddressKind::Operator,
            AddressKind::CertificationAuthority,
            AddressKind::TaskType,
            AddressKind::ProductType,
            AddressKind::PropertyType,
            AddressKind::Company,
            AddressKind::Field,
            AddressKind::Batch,
        ];
        for (i, a) in kinds.iter().enumerate() {
            assert!(a.prefix().starts_with(NAMESPACE));
            for b in &kinds[i + 1..] {
                assert_ne!(a.prefix(), b.prefix());
            }
        }
    }
}
