//! Shared fixtures for the integration tests.
//!
//! `World::bootstrap` drives the real service through genesis and
//! registration so every test starts from a ledger populated the same way a
//! running deployment would be. Batches are seeded directly through the state
//! port: they enter the ledger via the external event subsystem, which these
//! tests stand in for.
#![allow(dead_code)]

use chrono::Utc;
use tempfile::TempDir;

use supply_ledger::addressing;
use supply_ledger::entities::{
    Batch, Company, DataKind, Field, Location, TimeStamp, UnitOfMeasure,
};
use supply_ledger::error::CoreError;
use supply_ledger::payload::{
    Action, CreateCertificationAuthorityAction, CreateCompanyAction, CreateOperatorAction,
    CreateProductTypeAction, CreatePropertyTypeAction, CreateTaskTypeAction, TransactionPayload,
};
use supply_ledger::service::LedgerService;
use supply_ledger::state::{self, StatePort, WriteSet};

/// Deterministic 66-hex-char public key for test identities.
pub fn test_key(n: u64) -> String {
    format!("02{n:064x}")
}

/// Fixed timestamp so write-sets are reproducible across runs.
pub fn ts() -> TimeStamp<Utc> {
    TimeStamp::new_with(2024, 6, 15, 10, 30, 0)
}

pub fn location() -> Location {
    Location {
        latitude: 44_494_887,
        longitude: 11_342_616,
    }
}

/// A populated ledger: one system admin, two companies with one operator
/// each, a certification authority, two task types, two product types and two
/// property types.
///
/// Conventions the rejection tests lean on:
/// - `product_address` ("tomato") is enabled for both companies, certified by
///   the authority and enabled for both property types.
/// - `product_b_address` ("wheat") is enabled only for company A, certified
///   by nobody and enabled for no property type.
/// - operators are assigned `task_address`; `task_b_address` is enabled only
///   for `property_restricted_address`.
pub struct World {
    pub service: LedgerService,
    pub sys_admin: String,
    pub admin_a: String,
    pub admin_b: String,
    pub operator_a: String,
    pub operator_b: String,
    pub certifier: String,
    pub company_a_id: String,
    pub company_a_address: String,
    pub company_b_id: String,
    pub company_b_address: String,
    pub task_address: String,
    pub task_b_address: String,
    pub product_address: String,
    pub product_b_address: String,
    pub property_address: String,
    pub property_restricted_address: String,
    _temp: TempDir,
}

impl World {
    pub fn bootstrap() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let service = LedgerService::open(temp.path().join("ledger.db")).expect("open ledger");

        let sys_admin = test_key(1);
        let admin_a = test_key(2);
        let admin_b = test_key(3);
        let operator_a = test_key(4);
        let operator_b = test_key(5);
        let certifier = test_key(6);

        let world = World {
            service,
            task_address: addressing::task_type_address("harvester"),
            task_b_address: addressing::task_type_address("packer"),
            product_address: addressing::product_type_address("tomato"),
            product_b_address: addressing::product_type_address("wheat"),
            property_address: addressing::property_type_address("temperature"),
            property_restricted_address: addressing::property_type_address("net-weight"),
            company_a_id: addressing::hash_and_slice(&admin_a, 10),
            company_a_address: addressing::company_address(&addressing::hash_and_slice(
                &admin_a, 10,
            )),
            company_b_id: addressing::hash_and_slice(&admin_b, 10),
            company_b_address: addressing::company_address(&addressing::hash_and_slice(
                &admin_b, 10,
            )),
            sys_admin,
            admin_a,
            admin_b,
            operator_a,
            operator_b,
            certifier,
            _temp: temp,
        };

        world
            .execute(&world.sys_admin, Action::CreateSystemAdmin)
            .expect("genesis");

        for (id, role) in [("harvester", "harvesting"), ("packer", "packaging")] {
            world
                .execute(
                    &world.sys_admin,
                    Action::CreateTaskType(CreateTaskTypeAction {
                        id: id.into(),
                        role: role.into(),
                    }),
                )
                .expect("task type");
        }

        for (id, name) in [("tomato", "Tomato"), ("wheat", "Wheat")] {
            world
                .execute(
                    &world.sys_admin,
                    Action::CreateProductType(CreateProductTypeAction {
                        id: id.into(),
                        name: name.into(),
                        description: format!("{name} crop"),
                        measure: UnitOfMeasure::Kilograms,
                        derived_products: vec![],
                    }),
                )
                .expect("product type");
        }

        world
            .execute(
                &world.sys_admin,
                Action::CreatePropertyType(CreatePropertyTypeAction {
                    id: "temperature".into(),
                    name: "Storage temperature".into(),
                    data_kind: DataKind::Number,
                    enabled_task_types: vec![world.task_address.clone()],
                    enabled_product_types: vec![world.product_address.clone()],
                }),
            )
            .expect("property type");
        world
            .execute(
                &world.sys_admin,
                Action::CreatePropertyType(CreatePropertyTypeAction {
                    id: "net-weight".into(),
                    name: "Net weight".into(),
                    data_kind: DataKind::Number,
                    enabled_task_types: vec![world.task_b_address.clone()],
                    enabled_product_types: vec![world.product_address.clone()],
                }),
            )
            .expect("restricted property type");

        world
            .execute(
                &world.sys_admin,
                Action::CreateCertificationAuthority(CreateCertificationAuthorityAction {
                    public_key: world.certifier.clone(),
                    name: "AgriCert".into(),
                    website: "https://agricert.example".into(),
                    products: vec![world.product_address.clone()],
                }),
            )
            .expect("certification authority");

        world
            .execute(
                &world.sys_admin,
                Action::CreateCompany(CreateCompanyAction {
                    name: "Green Fields".into(),
                    description: "Producer".into(),
                    website: "https://greenfields.example".into(),
                    admin: world.admin_a.clone(),
                    enabled_product_types: vec![
                        world.product_address.clone(),
                        world.product_b_address.clone(),
                    ],
                }),
            )
            .expect("company A");
        world
            .execute(
                &world.sys_admin,
                Action::CreateCompany(CreateCompanyAction {
                    name: "Packhouse".into(),
                    description: "Distributor".into(),
                    website: "https://packhouse.example".into(),
                    admin: world.admin_b.clone(),
                    enabled_product_types: vec![world.product_address.clone()],
                }),
            )
            .expect("company B");

        world
            .execute(
                &world.admin_a,
                Action::CreateOperator(CreateOperatorAction {
                    public_key: world.operator_a.clone(),
                    task: world.task_address.clone(),
                }),
            )
            .expect("operator A");
        world
            .execute(
                &world.admin_b,
                Action::CreateOperator(CreateOperatorAction {
                    public_key: world.operator_b.clone(),
                    task: world.task_address.clone(),
                }),
            )
            .expect("operator B");

        world
    }

    pub fn execute(&self, signer: &str, action: Action) -> Result<WriteSet, CoreError> {
        self.service
            .execute(signer, &TransactionPayload::new(ts(), action))
    }

    /// Seed a batch owned by the company at `company_address`, carrying
    /// `product` as its product type.
    pub fn seed_batch(&self, batch_id: &str, company_address: &str, product: &str) {
        let port = self.service.port();
        let addresses = vec![company_address.to_string()];
        let snapshot = port.read(&addresses).expect("read company");
        let mut company: Company =
            state::get_decoded(&snapshot, company_address, "Company").expect("decode company");
        company.batches.push(batch_id.to_string());

        let batch = Batch {
            id: batch_id.to_string(),
            company: company_address.to_string(),
            product: product.to_string(),
            properties: vec![],
            certificates: vec![],
            proposals: vec![],
            finalization: None,
            timestamp: ts(),
        };

        let mut updates = WriteSet::new();
        updates.insert(
            addressing::batch_address(batch_id),
            state::encode(&batch).expect("encode batch"),
        );
        updates.insert(
            company_address.to_string(),
            state::encode(&company).expect("encode company"),
        );
        port.write(updates).expect("seed batch");
    }

    pub fn read_company(&self, address: &str) -> Company {
        let addresses = vec![address.to_string()];
        let snapshot = self.service.port().read(&addresses).expect("read");
        state::get_decoded(&snapshot, address, "Company").expect("decode company")
    }

    pub fn read_batch(&self, batch_id: &str) -> Batch {
        let address = addressing::batch_address(batch_id);
        let addresses = vec![address.clone()];
        let snapshot = self.service.port().read(&addresses).expect("read");
        state::get_decoded(&snapshot, &address, "Batch").expect("decode batch")
    }

    pub fn read_field(&self, field_id: &str, company_id: &str) -> Field {
        let address = addressing::field_address(field_id, company_id);
        let addresses = vec![address.clone()];
        let snapshot = self.service.port().read(&addresses).expect("read");
        state::get_decoded(&snapshot, &address, "Field").expect("decode field")
    }
}
