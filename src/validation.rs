//! Shared validation pipeline used by every action handler.
//!
//! Each helper either passes or rejects with exactly one [`CoreError`];
//! handlers call them in their documented precondition order so the first
//! failing check decides the rejection on every node.

use crate::addressing::{self, AddressKind};
use crate::entities::{
    CertificationAuthority, CompanyAdmin, DataKind, Operator, PropertyValue, SystemAdmin,
};
use crate::error::CoreError;
use crate::state::{self, StatePort};

/// Public keys are compressed-point hex strings of this length.
pub const PUBLIC_KEY_LEN: usize = 66;

/// Reject with MissingField if `value` is empty.
pub fn require_non_empty(value: &str, name: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::MissingField(format!("no {name} specified")));
    }
    Ok(())
}

pub fn is_valid_public_key(key: &str) -> bool {
    key.len() == PUBLIC_KEY_LEN && key.chars().all(|c| c.is_ascii_hexdigit())
}

/// Reject with InvalidIdentity if `key` is not a well-formed public key.
pub fn require_valid_public_key(key: &str) -> Result<(), CoreError> {
    if !is_valid_public_key(key) {
        return Err(CoreError::InvalidIdentity(format!(
            "{key} is not a valid public key"
        )));
    }
    Ok(())
}

/// Reject with IdentityConflict if `key` already holds any identity role.
/// A public key may be bound to at most one of: System Admin, Company Admin,
/// Operator, Certification Authority.
pub fn require_unused_identity<S: StatePort>(port: &S, key: &str) -> Result<(), CoreError> {
    let system_admin = addressing::system_admin_address();
    let addresses = vec![
        system_admin.clone(),
        addressing::company_admin_address(key),
        addressing::operator_address(key),
        addressing::certification_authority_address(key),
    ];
    let snapshot = port.read(&addresses)?;

    if let Ok(admin) = state::get_decoded::<SystemAdmin>(&snapshot, &system_admin, "System Admin") {
        if admin.public_key == key {
            return Err(CoreError::IdentityConflict(format!(
                "the public key {key} is the System Admin"
            )));
        }
    }
    for address in &addresses[1..] {
        if state::exists(&snapshot, address) {
            return Err(CoreError::IdentityConflict(format!(
                "the public key {key} already belongs to another role"
            )));
        }
    }
    Ok(())
}

/// Reject with UnknownReference unless every address is well-formed, carries
/// the expected kind prefix and holds a live record.
pub fn require_existing_of_kind<S: StatePort>(
    port: &S,
    addresses: &[String],
    kind: AddressKind,
) -> Result<(), CoreError> {
    for address in addresses {
        if !addressing::is_valid_address(address) || !address.starts_with(kind.prefix()) {
            return Err(CoreError::UnknownReference(format!(
                "{address} is not a {} address",
                kind.describe()
            )));
        }
    }
    let snapshot = port.read(addresses)?;
    for address in addresses {
        if !state::exists(&snapshot, address) {
            return Err(CoreError::UnknownReference(format!(
                "no {} at {address}",
                kind.describe()
            )));
        }
    }
    Ok(())
}

/// Reject with NotEnabled if `value` is absent from `collection`.
pub fn require_member(collection: &[String], value: &str, what: &str) -> Result<(), CoreError> {
    if !collection.iter().any(|member| member == value) {
        return Err(CoreError::NotEnabled(format!("{value} is not {what}")));
    }
    Ok(())
}

/// Resolve the singleton System Admin and require the signer to be it.
pub fn require_system_admin<S: StatePort>(
    port: &S,
    signer: &str,
) -> Result<SystemAdmin, CoreError> {
    let address = addressing::system_admin_address();
    let snapshot = port.read(std::slice::from_ref(&address))?;
    let not_admin = || CoreError::InvalidIdentity("the signer is not the System Admin".to_string());

    let admin: SystemAdmin =
        state::get_decoded(&snapshot, &address, "System Admin").map_err(|_| not_admin())?;
    if admin.public_key != signer {
        return Err(not_admin());
    }
    Ok(admin)
}

/// Resolve the signer's CompanyAdmin record.
pub fn require_company_admin<S: StatePort>(
    port: &S,
    signer: &str,
) -> Result<CompanyAdmin, CoreError> {
    let address = addressing::company_admin_address(signer);
    let snapshot = port.read(std::slice::from_ref(&address))?;
    state::get_decoded(&snapshot, &address, "Company Admin").map_err(|_| {
        CoreError::InvalidIdentity(
            "you must be a Company Admin with a Company to perform this action".to_string(),
        )
    })
}

/// Resolve the signer's Operator record.
pub fn require_operator<S: StatePort>(port: &S, signer: &str) -> Result<Operator, CoreError> {
    let address = addressing::operator_address(signer);
    let snapshot = port.read(std::slice::from_ref(&address))?;
    state::get_decoded(&snapshot, &address, "Operator").map_err(|_| {
        CoreError::InvalidIdentity("you must be an Operator for a Company".to_string())
    })
}

/// Resolve the signer's CertificationAuthority record.
pub fn require_certification_authority<S: StatePort>(
    port: &S,
    signer: &str,
) -> Result<CertificationAuthority, CoreError> {
    let address = addressing::certification_authority_address(signer);
    let snapshot = port.read(std::slice::from_ref(&address))?;
    state::get_decoded(&snapshot, &address, "Certification Authority").map_err(|_| {
        CoreError::InvalidIdentity(
            "you must be a Certification Authority to certify a Batch".to_string(),
        )
    })
}

/// Reject with InvalidValue unless `value` agrees with the property's
/// declared kind and carries a usable payload: numbers must be non-zero,
/// strings and byte strings non-empty. Locations are present by construction.
pub fn require_well_formed_value(value: &PropertyValue, kind: DataKind) -> Result<(), CoreError> {
    if value.kind() != kind {
        return Err(CoreError::InvalidValue(format!(
            "value of kind {:?} provided for a property of kind {kind:?}",
            value.kind()
        )));
    }
    let payload_ok = match value {
        PropertyValue::Number(n) => *n != 0.0,
        PropertyValue::String(s) => !s.is_empty(),
        PropertyValue::Bytes(b) => !b.is_empty(),
        PropertyValue::Location(_) => true,
    };
    if !payload_ok {
        return Err(CoreError::InvalidValue(format!(
            "no correct value provided for a property of kind {kind:?}"
        )));
    }
    Ok(())
}
