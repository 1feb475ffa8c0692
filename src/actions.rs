//! Action handlers: one validation + delta-computation function per
//! operation.
//!
//! Every handler is a pure function of the payload and the ledger snapshot it
//! reads through the port. Preconditions are checked in a fixed, documented
//! order and the first failure aborts the handler with exactly one
//! [`CoreError`]; on success the handler returns the minimal write-set and
//! writes nothing itself. No partial state ever leaves a handler.

use chrono::Utc;

use crate::addressing::{self, AddressKind};
use crate::entities::{
    Batch, Certificate, CertificationAuthority, Company, CompanyAdmin, Field, Finalization,
    Operator, ProductType, PropertyType, Proposal, ProposalStatus, SystemAdmin, TaskType,
    TimeStamp,
};
use crate::error::CoreError;
use crate::payload::{
    Action, AddBatchCertificateAction, AnswerProposalAction, CreateCertificationAuthorityAction,
    CreateCompanyAction, CreateFieldAction, CreateOperatorAction, CreateProductTypeAction,
    CreatePropertyTypeAction, CreateProposalAction, CreateTaskTypeAction, FinalizeBatchAction,
    RecordBatchPropertyAction, TransactionPayload,
};
use crate::state::{self, StatePort, WriteSet};
use crate::validation::{
    require_certification_authority, require_company_admin, require_existing_of_kind,
    require_member, require_non_empty, require_operator, require_system_admin,
    require_unused_identity, require_valid_public_key, require_well_formed_value,
};

/// Dispatch a decoded payload to its handler.
///
/// The match is exhaustive over [`Action`], so every operation has exactly one
/// handler by construction. The payload timestamp is required for every
/// action and checked here, before any handler runs.
pub fn apply<S: StatePort>(
    port: &S,
    signer: &str,
    payload: &TransactionPayload,
) -> Result<WriteSet, CoreError> {
    let timestamp = payload
        .timestamp
        .clone()
        .ok_or_else(|| CoreError::MissingField("no timestamp specified".to_string()))?;

    match &payload.action {
        Action::CreateSystemAdmin => create_system_admin(port, signer, timestamp),
        Action::CreateTaskType(action) => create_task_type(port, signer, timestamp, action),
        Action::CreateProductType(action) => create_product_type(port, signer, timestamp, action),
        Action::CreatePropertyType(action) => {
            create_property_type(port, signer, timestamp, action)
        }
        Action::CreateCertificationAuthority(action) => {
            create_certification_authority(port, signer, timestamp, action)
        }
        Action::CreateCompany(action) => create_company(port, signer, timestamp, action),
        Action::CreateOperator(action) => create_operator(port, signer, timestamp, action),
        Action::CreateField(action) => create_field(port, signer, timestamp, action),
        Action::AddBatchCertificate(action) => {
            add_batch_certificate(port, signer, timestamp, action)
        }
        Action::RecordBatchProperty(action) => {
            record_batch_property(port, signer, timestamp, action)
        }
        Action::CreateProposal(action) => create_proposal(port, signer, timestamp, action),
        Action::AnswerProposal(action) => answer_proposal(port, signer, timestamp, action),
        Action::FinalizeBatch(action) => finalize_batch(port, signer, timestamp, action),
    }
}

/// Genesis bootstrap: record the signer as the singleton System Admin.
pub fn create_system_admin<S: StatePort>(
    port: &S,
    signer: &str,
    timestamp: TimeStamp<Utc>,
) -> Result<WriteSet, CoreError> {
    require_valid_public_key(signer)?;

    let address = addressing::system_admin_address();
    let snapshot = port.read(std::slice::from_ref(&address))?;
    if state::exists(&snapshot, &address) {
        return Err(CoreError::StateConflict(
            "a System Admin is already recorded".to_string(),
        ));
    }
    require_unused_identity(port, signer)?;

    let mut updates = WriteSet::new();
    updates.insert(
        address,
        state::encode(&SystemAdmin {
            public_key: signer.to_string(),
            timestamp,
        })?,
    );
    Ok(updates)
}

pub fn create_task_type<S: StatePort>(
    port: &S,
    signer: &str,
    timestamp: TimeStamp<Utc>,
    action: &CreateTaskTypeAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.id, "id")?;
    require_non_empty(&action.role, "role")?;
    require_system_admin(port, signer)?;

    let address = addressing::task_type_address(&action.id);
    let snapshot = port.read(std::slice::from_ref(&address))?;
    if state::exists(&snapshot, &address) {
        return Err(CoreError::StateConflict(format!(
            "a Task Type with id {} already exists",
            action.id
        )));
    }

    let mut updates = WriteSet::new();
    updates.insert(
        address,
        state::encode(&TaskType {
            id: action.id.clone(),
            role: action.role.clone(),
            timestamp,
        })?,
    );
    Ok(updates)
}

pub fn create_product_type<S: StatePort>(
    port: &S,
    signer: &str,
    timestamp: TimeStamp<Utc>,
    action: &CreateProductTypeAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.id, "id")?;
    require_non_empty(&action.name, "name")?;
    require_non_empty(&action.description, "description")?;
    require_system_admin(port, signer)?;

    let derived_addresses: Vec<String> = action
        .derived_products
        .iter()
        .map(|d| d.product.clone())
        .collect();
    require_existing_of_kind(port, &derived_addresses, AddressKind::ProductType)?;
    for derived in &action.derived_products {
        if !(derived.conversion_rate > 0.0) {
            return Err(CoreError::InvalidValue(format!(
                "conversion rate for derived product {} is not greater than zero",
                derived.product
            )));
        }
    }

    let address = addressing::product_type_address(&action.id);
    let snapshot = port.read(std::slice::from_ref(&address))?;
    if state::exists(&snapshot, &address) {
        return Err(CoreError::StateConflict(format!(
            "a Product Type with id {} already exists",
            action.id
        )));
    }

    let mut updates = WriteSet::new();
    updates.insert(
        address,
        state::encode(&ProductType {
            id: action.id.clone(),
            name: action.name.clone(),
            description: action.description.clone(),
            measure: action.measure,
            derived_products: action.derived_products.clone(),
            timestamp,
        })?,
    );
    Ok(updates)
}

pub fn create_property_type<S: StatePort>(
    port: &S,
    signer: &str,
    timestamp: TimeStamp<Utc>,
    action: &CreatePropertyTypeAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.id, "id")?;
    require_non_empty(&action.name, "name")?;
    if action.enabled_task_types.is_empty() {
        return Err(CoreError::MissingField(
            "no enabled task types specified".to_string(),
        ));
    }
    if action.enabled_product_types.is_empty() {
        return Err(CoreError::MissingField(
            "no enabled product types specified".to_string(),
        ));
    }
    require_system_admin(port, signer)?;
    require_existing_of_kind(port, &action.enabled_task_types, AddressKind::TaskType)?;
    require_existing_of_kind(port, &action.enabled_product_types, AddressKind::ProductType)?;

    let address = addressing::property_type_address(&action.id);
    let snapshot = port.read(std::slice::from_ref(&address))?;
    if state::exists(&snapshot, &address) {
        return Err(CoreError::StateConflict(format!(
            "a Property Type with id {} already exists",
            action.id
        )));
    }

    let mut updates = WriteSet::new();
    updates.insert(
        address,
        state::encode(&PropertyType {
            id: action.id.clone(),
            name: action.name.clone(),
            data_kind: action.data_kind,
            enabled_task_types: action.enabled_task_types.clone(),
            enabled_product_types: action.enabled_product_types.clone(),
            timestamp,
        })?,
    );
    Ok(updates)
}

pub fn create_certification_authority<S: StatePort>(
    port: &S,
    signer: &str,
    timestamp: TimeStamp<Utc>,
    action: &CreateCertificationAuthorityAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.name, "name")?;
    require_non_empty(&action.website, "website")?;
    if action.products.is_empty() {
        return Err(CoreError::MissingField("no products specified".to_string()));
    }
    require_valid_public_key(&action.public_key)?;
    require_system_admin(port, signer)?;
    require_unused_identity(port, &action.public_key)?;
    require_existing_of_kind(port, &action.products, AddressKind::ProductType)?;

    let mut updates = WriteSet::new();
    updates.insert(
        addressing::certification_authority_address(&action.public_key),
        state::encode(&CertificationAuthority {
            public_key: action.public_key.clone(),
            name: action.name.clone(),
            website: action.website.clone(),
            products: action.products.clone(),
            timestamp,
        })?,
    );
    Ok(updates)
}

/// Record a new Company and its Company Admin.
///
/// Only the System Admin may register companies. The company id is derived
/// from the admin's public key, so one key maps to at most one company; the
/// unused-identity check makes the conflict explicit before the derivation
/// could collide.
pub fn create_company<S: StatePort>(
    port: &S,
    signer: &str,
    timestamp: TimeStamp<Utc>,
    action: &CreateCompanyAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.name, "name")?;
    require_non_empty(&action.description, "description")?;
    require_non_empty(&action.website, "website")?;
    require_valid_public_key(&action.admin)?;
    require_system_admin(port, signer)?;
    require_unused_identity(port, &action.admin)?;
    require_existing_of_kind(port, &action.enabled_product_types, AddressKind::ProductType)?;

    let id = addressing::hash_and_slice(&action.admin, 10);
    let company_address = addressing::company_address(&id);

    let mut updates = WriteSet::new();
    updates.insert(
        addressing::company_admin_address(&action.admin),
        state::encode(&CompanyAdmin {
            public_key: action.admin.clone(),
            company: company_address.clone(),
            timestamp: timestamp.clone(),
        })?,
    );
    updates.insert(
        company_address,
        state::encode(&Company {
            id,
            name: action.name.clone(),
            description: action.description.clone(),
            website: action.website.clone(),
            admin_public_key: action.admin.clone(),
            enabled_product_types: action.enabled_product_types.clone(),
            fields: vec![],
            operators: vec![],
            batches: vec![],
            timestamp,
        })?,
    );
    Ok(updates)
}

/// Register an Operator for the signer's Company.
pub fn create_operator<S: StatePort>(
    port: &S,
    signer: &str,
    timestamp: TimeStamp<Utc>,
    action: &CreateOperatorAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.task, "task")?;
    require_valid_public_key(&action.public_key)?;
    let admin = require_company_admin(port, signer)?;
    require_unused_identity(port, &action.public_key)?;
    require_existing_of_kind(port, std::slice::from_ref(&action.task), AddressKind::TaskType)?;

    let snapshot = port.read(std::slice::from_ref(&admin.company))?;
    let mut company: Company = state::get_decoded(&snapshot, &admin.company, "Company")?;

    let operator_address = addressing::operator_address(&action.public_key);
    company.operators.push(operator_address.clone());

    let mut updates = WriteSet::new();
    updates.insert(
        operator_address,
        state::encode(&Operator {
            public_key: action.public_key.clone(),
            company: admin.company.clone(),
            task: action.task.clone(),
            timestamp,
        })?,
    );
    updates.insert(admin.company, state::encode(&company)?);
    Ok(updates)
}

/// Record a new Field and append it to the owning Company's field list.
///
/// Field ids are scoped to the creating company: the derived address mixes
/// the id with the company id, so two companies may reuse the same field id
/// without colliding.
pub fn create_field<S: StatePort>(
    port: &S,
    signer: &str,
    _timestamp: TimeStamp<Utc>,
    action: &CreateFieldAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.id, "id")?;
    require_non_empty(&action.description, "description")?;
    let admin = require_company_admin(port, signer)?;
    require_existing_of_kind(
        port,
        std::slice::from_ref(&action.product),
        AddressKind::ProductType,
    )?;

    // The signer is the company admin, so the company id (derived from the
    // admin key at registration) doubles as the field-address salt.
    let company_address = admin.company.clone();
    let field_address =
        addressing::field_address(&action.id, &addressing::hash_and_slice(signer, 10));
    let snapshot = port.read(&[company_address.clone(), field_address.clone()])?;
    let mut company: Company = state::get_decoded(&snapshot, &company_address, "Company")?;

    require_member(
        &company.enabled_product_types,
        &action.product,
        "an enabled Company Product Type",
    )?;
    if !(action.quantity > 0.0) {
        return Err(CoreError::InvalidValue(format!(
            "specified quantity is not greater than zero: {}",
            action.quantity
        )));
    }
    if state::exists(&snapshot, &field_address) {
        return Err(CoreError::StateConflict(format!(
            "the id {} already belongs to a company Field",
            action.id
        )));
    }

    company.fields.push(field_address.clone());

    let mut updates = WriteSet::new();
    updates.insert(
        field_address,
        state::encode(&Field {
            id: action.id.clone(),
            description: action.description.clone(),
            company: company_address.clone(),
            product: action.product.clone(),
            quantity: action.quantity,
            location: action.location.clone(),
            events: vec![],
        })?,
    );
    updates.insert(company_address, state::encode(&company)?);
    Ok(updates)
}

/// Append a Certificate to a Batch on behalf of a Certification Authority.
///
/// Duplicate certificates are not deduplicated: an identical submission is
/// appended again, keeping the full audit trail.
pub fn add_batch_certificate<S: StatePort>(
    port: &S,
    signer: &str,
    timestamp: TimeStamp<Utc>,
    action: &AddBatchCertificateAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.batch, "batch")?;
    require_non_empty(&action.company, "company")?;
    require_non_empty(&action.link, "link")?;
    require_non_empty(&action.hash, "hash")?;
    if !is_sha512_hex(&action.hash) {
        return Err(CoreError::InvalidValue(
            "provided hash doesn't contain a valid SHA-512 value".to_string(),
        ));
    }
    let authority = require_certification_authority(port, signer)?;

    let company_address = addressing::company_address(&action.company);
    let batch_address = addressing::batch_address(&action.batch);
    let snapshot = port.read(&[company_address.clone(), batch_address.clone()])?;

    let company: Company = state::get_decoded(&snapshot, &company_address, "Company")?;
    require_member(&company.batches, &action.batch, "a Company Batch")?;
    let mut batch: Batch = state::get_decoded(&snapshot, &batch_address, "Batch")?;
    require_member(
        &authority.products,
        &batch.product,
        "a product this authority may certify",
    )?;

    batch.certificates.push(Certificate {
        authority: signer.to_string(),
        link: action.link.clone(),
        hash: action.hash.clone(),
        timestamp,
    });

    let mut updates = WriteSet::new();
    updates.insert(batch_address, state::encode(&batch)?);
    Ok(updates)
}

/// Record a property value on a Batch.
///
/// Values accumulate per property type as an ordered, append-only history:
/// the first recording creates the property record, later ones append to it.
pub fn record_batch_property<S: StatePort>(
    port: &S,
    signer: &str,
    _timestamp: TimeStamp<Utc>,
    action: &RecordBatchPropertyAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.batch, "batch")?;
    require_non_empty(&action.property, "property")?;
    let operator = require_operator(port, signer)?;
    require_existing_of_kind(
        port,
        std::slice::from_ref(&action.property),
        AddressKind::PropertyType,
    )?;

    let batch_address = addressing::batch_address(&action.batch);
    let snapshot = port.read(&[
        action.property.clone(),
        operator.company.clone(),
        batch_address.clone(),
    ])?;

    let property_type: PropertyType =
        state::get_decoded(&snapshot, &action.property, "Property Type")?;
    let company: Company = state::get_decoded(&snapshot, &operator.company, "Company")?;
    require_member(&company.batches, &action.batch, "a Company Batch")?;
    let mut batch: Batch = state::get_decoded(&snapshot, &batch_address, "Batch")?;

    require_member(
        &property_type.enabled_task_types,
        &operator.task,
        "a task enabled for this property",
    )?;
    require_member(
        &property_type.enabled_product_types,
        &batch.product,
        "a product enabled for this property",
    )?;
    require_well_formed_value(&action.value, property_type.data_kind)?;

    batch.record_property_value(&property_type.id, action.value.clone());

    let mut updates = WriteSet::new();
    updates.insert(batch_address, state::encode(&batch)?);
    Ok(updates)
}

/// Open a batch-ownership-transfer Proposal towards a receiver Company.
pub fn create_proposal<S: StatePort>(
    port: &S,
    signer: &str,
    timestamp: TimeStamp<Utc>,
    action: &CreateProposalAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.batch, "batch")?;
    require_non_empty(&action.receiver_company, "receiver company")?;
    let operator = require_operator(port, signer)?;

    let receiver_address = addressing::company_address(&action.receiver_company);
    let batch_address = addressing::batch_address(&action.batch);
    let snapshot = port.read(&[
        operator.company.clone(),
        receiver_address.clone(),
        batch_address.clone(),
    ])?;

    let sender: Company = state::get_decoded(&snapshot, &operator.company, "Company")?;
    require_member(&sender.batches, &action.batch, "a Company Batch")?;
    let receiver: Company = state::get_decoded(&snapshot, &receiver_address, "Company")?;
    let mut batch: Batch = state::get_decoded(&snapshot, &batch_address, "Batch")?;
    require_member(
        &receiver.enabled_product_types,
        &batch.product,
        "enabled for the receiver Company",
    )?;
    if batch.has_issued_proposal() {
        return Err(CoreError::StateConflict(format!(
            "the batch {} already has an issued Proposal",
            action.batch
        )));
    }

    batch.proposals.push(Proposal {
        sender_company: sender.id.clone(),
        receiver_company: action.receiver_company.clone(),
        status: ProposalStatus::Issued,
        notes: action.notes.clone(),
        timestamp,
    });

    let mut updates = WriteSet::new();
    updates.insert(batch_address, state::encode(&batch)?);
    Ok(updates)
}

/// Answer an open Proposal: Accepted, Rejected or Canceled.
///
/// Cancellation is reserved to the sender company's operators, acceptance and
/// rejection to the receiver company's. Accepting moves the batch id from the
/// sender's batch list to the receiver's and repoints the batch's owning
/// company, all in one write-set. If more than one proposal matches (sender,
/// receiver, Issued), the most recently appended one is answered.
pub fn answer_proposal<S: StatePort>(
    port: &S,
    signer: &str,
    _timestamp: TimeStamp<Utc>,
    action: &AnswerProposalAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.batch, "batch")?;
    require_non_empty(&action.sender_company, "sender company")?;
    require_non_empty(&action.receiver_company, "receiver company")?;
    if action.response == ProposalStatus::Issued {
        return Err(CoreError::InvalidValue(
            "issued is not a valid proposal response".to_string(),
        ));
    }

    let operator_address = addressing::operator_address(signer);
    let sender_address = addressing::company_address(&action.sender_company);
    let receiver_address = addressing::company_address(&action.receiver_company);
    let batch_address = addressing::batch_address(&action.batch);
    let snapshot = port.read(&[
        operator_address.clone(),
        sender_address.clone(),
        receiver_address.clone(),
        batch_address.clone(),
    ])?;

    let mut sender: Company = state::get_decoded(&snapshot, &sender_address, "Company")?;
    let mut receiver: Company = state::get_decoded(&snapshot, &receiver_address, "Company")?;
    require_member(&sender.batches, &action.batch, "a Company Batch")?;
    let operator: Operator = state::get_decoded(&snapshot, &operator_address, "Operator")
        .map_err(|_| {
            CoreError::InvalidIdentity("you must be an Operator for a Company".to_string())
        })?;

    if action.response == ProposalStatus::Canceled && operator.company != sender_address {
        return Err(CoreError::AuthorizationDenied(
            "you must be an Operator from the sender Company to cancel a Proposal".to_string(),
        ));
    }
    if matches!(
        action.response,
        ProposalStatus::Accepted | ProposalStatus::Rejected
    ) && operator.company != receiver_address
    {
        return Err(CoreError::AuthorizationDenied(
            "you must be an Operator from the receiver Company to accept or reject a Proposal"
                .to_string(),
        ));
    }

    let mut batch: Batch = state::get_decoded(&snapshot, &batch_address, "Batch")?;
    let proposal = batch
        .issued_proposal_mut(&action.sender_company, &action.receiver_company)
        .ok_or_else(|| {
            CoreError::StateConflict(format!(
                "the batch {} has no issued Proposal between these companies",
                action.batch
            ))
        })?;
    proposal.status = action.response;

    let mut updates = WriteSet::new();
    if action.response == ProposalStatus::Accepted {
        if let Some(position) = sender.batches.iter().position(|id| id == &action.batch) {
            sender.batches.remove(position);
        }
        receiver.batches.push(action.batch.clone());
        batch.company = receiver_address.clone();

        updates.insert(sender_address, state::encode(&sender)?);
        updates.insert(receiver_address, state::encode(&receiver)?);
    }
    updates.insert(batch_address, state::encode(&batch)?);
    Ok(updates)
}

/// Record why a Batch left active circulation.
///
/// Finalizing does not freeze the batch: later operations, including another
/// finalization, remain valid and the record is overwritten in place.
pub fn finalize_batch<S: StatePort>(
    port: &S,
    signer: &str,
    _timestamp: TimeStamp<Utc>,
    action: &FinalizeBatchAction,
) -> Result<WriteSet, CoreError> {
    require_non_empty(&action.batch, "batch")?;
    let operator = require_operator(port, signer)?;

    let batch_address = addressing::batch_address(&action.batch);
    let snapshot = port.read(&[operator.company.clone(), batch_address.clone()])?;

    let company: Company = state::get_decoded(&snapshot, &operator.company, "Company")?;
    require_member(&company.batches, &action.batch, "a Company Batch")?;
    let mut batch: Batch = state::get_decoded(&snapshot, &batch_address, "Batch")?;

    batch.finalization = Some(Finalization {
        reason: action.reason,
        reporter: signer.to_string(),
        explanation: action.explanation.clone(),
    });

    let mut updates = WriteSet::new();
    updates.insert(batch_address, state::encode(&batch)?);
    Ok(updates)
}

/// A 512-bit digest in hex: exactly 128 hex characters.
fn is_sha512_hex(hash: &str) -> bool {
    hash.len() == 128 && hash.chars().all(|c| c.is_ascii_hexdigit())
}
