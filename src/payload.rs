//! Inbound transaction payloads.
//!
//! The caller verifies the signature, decodes the payload and hands the core
//! an authenticated signer identity alongside it. The action is a closed
//! tagged union, so an action tag without its nested struct is
//! unrepresentable after decoding; the only pre-dispatch check left is the
//! timestamp, which every action requires.

use chrono::Utc;

use crate::entities::{
    DataKind, DerivedProduct, FinalizationReason, Location, PropertyValue, ProposalStatus,
    TimeStamp, UnitOfMeasure,
};

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct CreateTaskTypeAction {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct CreateProductTypeAction {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub description: String,
    #[n(3)]
    pub measure: UnitOfMeasure,
    #[n(4)]
    pub derived_products: Vec<DerivedProduct>,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct CreatePropertyTypeAction {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub data_kind: DataKind,
    /// TaskType addresses.
    #[n(3)]
    pub enabled_task_types: Vec<String>,
    /// ProductType addresses.
    #[n(4)]
    pub enabled_product_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct CreateCertificationAuthorityAction {
    #[n(0)]
    pub public_key: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub website: String,
    /// Authorized ProductType addresses.
    #[n(3)]
    pub products: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct CreateCompanyAction {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub description: String,
    #[n(2)]
    pub website: String,
    /// The Company Admin's public key.
    #[n(3)]
    pub admin: String,
    /// ProductType addresses the company is enabled for.
    #[n(4)]
    pub enabled_product_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct CreateOperatorAction {
    #[n(0)]
    pub public_key: String,
    /// Assigned TaskType address.
    #[n(1)]
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct CreateFieldAction {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub description: String,
    /// ProductType address of the cultivated product.
    #[n(2)]
    pub product: String,
    /// Predicted maximum production quantity.
    #[n(3)]
    pub quantity: f64,
    #[n(4)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct AddBatchCertificateAction {
    /// Batch id.
    #[n(0)]
    pub batch: String,
    /// Owning Company id.
    #[n(1)]
    pub company: String,
    /// External reference to the certification document.
    #[n(2)]
    pub link: String,
    /// SHA-512 of the external document, hex.
    #[n(3)]
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct RecordBatchPropertyAction {
    /// Batch id.
    #[n(0)]
    pub batch: String,
    /// PropertyType address.
    #[n(1)]
    pub property: String,
    #[n(2)]
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct CreateProposalAction {
    /// Batch id.
    #[n(0)]
    pub batch: String,
    /// Receiver Company id.
    #[n(1)]
    pub receiver_company: String,
    #[n(2)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct AnswerProposalAction {
    /// Batch id.
    #[n(0)]
    pub batch: String,
    /// Sender Company id.
    #[n(1)]
    pub sender_company: String,
    /// Receiver Company id.
    #[n(2)]
    pub receiver_company: String,
    /// Accepted, Rejected or Canceled; Issued is not an answer.
    #[n(3)]
    pub response: ProposalStatus,
    #[n(4)]
    pub motivation: String,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct FinalizeBatchAction {
    /// Batch id.
    #[n(0)]
    pub batch: String,
    #[n(1)]
    pub reason: FinalizationReason,
    #[n(2)]
    pub explanation: String,
}

/// Every operation this transaction family accepts. The dispatch match in
/// [`crate::actions::apply`] is exhaustive, so adding a variant without a
/// handler fails to compile.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub enum Action {
    /// Genesis bootstrap: the signer becomes the singleton System Admin.
    #[n(0)]
    CreateSystemAdmin,
    #[n(1)]
    CreateTaskType(#[n(0)] CreateTaskTypeAction),
    #[n(2)]
    CreateProductType(#[n(0)] CreateProductTypeAction),
    #[n(3)]
    CreatePropertyType(#[n(0)] CreatePropertyTypeAction),
    #[n(4)]
    CreateCertificationAuthority(#[n(0)] CreateCertificationAuthorityAction),
    #[n(5)]
    CreateCompany(#[n(0)] CreateCompanyAction),
    #[n(6)]
    CreateOperator(#[n(0)] CreateOperatorAction),
    #[n(7)]
    CreateField(#[n(0)] CreateFieldAction),
    #[n(8)]
    AddBatchCertificate(#[n(0)] AddBatchCertificateAction),
    #[n(9)]
    RecordBatchProperty(#[n(0)] RecordBatchPropertyAction),
    #[n(10)]
    CreateProposal(#[n(0)] CreateProposalAction),
    #[n(11)]
    AnswerProposal(#[n(0)] AnswerProposalAction),
    #[n(12)]
    FinalizeBatch(#[n(0)] FinalizeBatchAction),
}

impl Action {
    /// Stable operation name, used for dispatch logging.
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateSystemAdmin => "create_system_admin",
            Action::CreateTaskType(_) => "create_task_type",
            Action::CreateProductType(_) => "create_product_type",
            Action::CreatePropertyType(_) => "create_property_type",
            Action::CreateCertificationAuthority(_) => "create_certification_authority",
            Action::CreateCompany(_) => "create_company",
            Action::CreateOperator(_) => "create_operator",
            Action::CreateField(_) => "create_field",
            Action::AddBatchCertificate(_) => "add_batch_certificate",
            Action::RecordBatchProperty(_) => "record_batch_property",
            Action::CreateProposal(_) => "create_proposal",
            Action::AnswerProposal(_) => "answer_proposal",
            Action::FinalizeBatch(_) => "finalize_batch",
        }
    }
}

/// The decoded inbound payload: one action plus the timestamp every action
/// requires. A missing timestamp is rejected before dispatch.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct TransactionPayload {
    #[n(0)]
    pub timestamp: Option<TimeStamp<Utc>>,
    #[n(1)]
    pub action: Action,
}

impl TransactionPayload {
    pub fn new(timestamp: TimeStamp<Utc>, action: Action) -> Self {
        Self {
            timestamp: Some(timestamp),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_cbor_roundtrip() {
        let payload = TransactionPayload::new(
            TimeStamp::new_with(2024, 6, 15, 10, 30, 0),
            Action::CreateProposal(CreateProposalAction {
                batch: "batch-1".into(),
                receiver_company: "4dcf12aa90".into(),
                notes: "first harvest lot".into(),
            }),
        );

        let encoded = minicbor::to_vec(&payload).unwrap();
        let decoded: TransactionPayload = minicbor::decode(&encoded).unwrap();

        assert_eq!(payload, decoded);
    }

    #[test]
    fn unit_action_roundtrip() {
        let payload = TransactionPayload::new(
            TimeStamp::new_with(2024, 1, 1, 0, 0, 0),
            Action::CreateSystemAdmin,
        );

        let encoded = minicbor::to_vec(&payload).unwrap();
        let decoded: TransactionPayload = minicbor::decode(&encoded).unwrap();

        assert_eq!(payload, decoded);
    }
}
