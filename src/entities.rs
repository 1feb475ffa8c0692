//! Ledger entity records and their CBOR encodings.
//!
//! Entities are immutable-by-replacement: a "mutation" reads the current
//! bytes, decodes, modifies the decoded structure and re-encodes to the same
//! address. All sub-lists (properties, certificates, proposals) preserve
//! insertion order.

use chrono::{DateTime, TimeZone, Utc};

/// Wall-clock instant carried by every transaction payload. Encoded as i64
/// nanoseconds since the Unix epoch. The core never reads the clock;
/// timestamps always arrive from the caller.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Approximate coordinates, in microdegrees.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Location {
    #[n(0)]
    pub latitude: i64,
    #[n(1)]
    pub longitude: i64,
}

/// Unit of measure a ProductType is quantified in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum UnitOfMeasure {
    #[n(0)]
    Kilograms,
    #[n(1)]
    Litres,
    #[n(2)]
    Metres,
    #[n(3)]
    Units,
}

/// Value kind a PropertyType declares for its recorded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum DataKind {
    #[n(0)]
    Number,
    #[n(1)]
    String,
    #[n(2)]
    Bytes,
    #[n(3)]
    Location,
}

/// A recorded value for a batch property. The variant encodes the payload's
/// presence, so a value can never be "partially set"; kind agreement with the
/// PropertyType is checked at record time.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub enum PropertyValue {
    #[n(0)]
    Number(#[n(0)] f64),
    #[n(1)]
    String(#[n(0)] String),
    #[n(2)]
    Bytes(#[n(0)] Vec<u8>),
    #[n(3)]
    Location(#[n(0)] Location),
}

impl PropertyValue {
    pub fn kind(&self) -> DataKind {
        match self {
            PropertyValue::Number(_) => DataKind::Number,
            PropertyValue::String(_) => DataKind::String,
            PropertyValue::Bytes(_) => DataKind::Bytes,
            PropertyValue::Location(_) => DataKind::Location,
        }
    }
}

/// Singleton bootstrap identity, recorded once at genesis and never mutated.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct SystemAdmin {
    #[n(0)]
    pub public_key: String,
    #[n(1)]
    pub timestamp: TimeStamp<Utc>,
}

/// Administrator of exactly one Company.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct CompanyAdmin {
    #[n(0)]
    pub public_key: String,
    /// Owning Company address.
    #[n(1)]
    pub company: String,
    #[n(2)]
    pub timestamp: TimeStamp<Utc>,
}

/// Field/batch worker registered to a Company with an assigned task.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Operator {
    #[n(0)]
    pub public_key: String,
    /// Owning Company address.
    #[n(1)]
    pub company: String,
    /// Assigned TaskType address.
    #[n(2)]
    pub task: String,
    #[n(3)]
    pub timestamp: TimeStamp<Utc>,
}

/// Independent certifier allowed to attach certificates to batches of the
/// product types it is authorized for.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct CertificationAuthority {
    #[n(0)]
    pub public_key: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub website: String,
    /// Authorized ProductType addresses.
    #[n(3)]
    pub products: Vec<String>,
    #[n(4)]
    pub timestamp: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct TaskType {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub role: String,
    #[n(2)]
    pub timestamp: TimeStamp<Utc>,
}

/// A product a ProductType can be transformed into, with the quantity
/// conversion rate of that transformation.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct DerivedProduct {
    /// ProductType address.
    #[n(0)]
    pub product: String,
    #[n(1)]
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct ProductType {
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
    #[n(5)]
    pub timestamp: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct PropertyType {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub data_kind: DataKind,
    /// TaskType addresses whose operators may record this property.
    #[n(3)]
    pub enabled_task_types: Vec<String>,
    /// ProductType addresses whose batches may carry this property.
    #[n(4)]
    pub enabled_product_types: Vec<String>,
    #[n(5)]
    pub timestamp: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Company {
    /// Derived from the admin's public key at creation.
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub description: String,
    #[n(3)]
    pub website: String,
    #[n(4)]
    pub admin_public_key: String,
    /// ProductType addresses this company may produce and handle.
    #[n(5)]
    pub enabled_product_types: Vec<String>,
    /// Field addresses, in registration order.
    #[n(6)]
    pub fields: Vec<String>,
    /// Operator addresses, in registration order.
    #[n(7)]
    pub operators: Vec<String>,
    /// Batch ids currently owned; shrinks only on an accepted transfer.
    #[n(8)]
    pub batches: Vec<String>,
    #[n(9)]
    pub timestamp: TimeStamp<Utc>,
}

/// Agronomic event recorded against a Field. Event recording happens in the
/// companion event subsystem outside this transaction family; fields carry
/// the list so the stored schema stays complete.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Event {
    #[n(0)]
    pub event_type: String,
    #[n(1)]
    pub reporter: String,
    #[n(2)]
    pub timestamp: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Field {
    /// Unique within the owning company, not globally.
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub description: String,
    /// Owning Company address.
    #[n(2)]
    pub company: String,
    /// Cultivated ProductType address.
    #[n(3)]
    pub product: String,
    /// Predicted maximum production quantity.
    #[n(4)]
    pub quantity: f64,
    #[n(5)]
    pub location: Location,
    #[n(6)]
    pub events: Vec<Event>,
}

/// Append-only value history for one property of a batch.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct BatchProperty {
    /// PropertyType id.
    #[n(0)]
    pub property_type: String,
    #[n(1)]
    pub values: Vec<PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Certificate {
    /// Issuing authority public key.
    #[n(0)]
    pub authority: String,
    /// External reference to the certification document.
    #[n(1)]
    pub link: String,
    /// SHA-512 of the external document, hex.
    #[n(2)]
    pub hash: String,
    #[n(3)]
    pub timestamp: TimeStamp<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum ProposalStatus {
    #[n(0)]
    Issued,
    #[n(1)]
    Accepted,
    #[n(2)]
    Rejected,
    #[n(3)]
    Canceled,
}

/// Batch-ownership-transfer offer between two companies. Append-only on the
/// batch; at most one proposal may be in Issued status at a time.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Proposal {
    /// Sender Company id.
    #[n(0)]
    pub sender_company: String,
    /// Receiver Company id.
    #[n(1)]
    pub receiver_company: String,
    #[n(2)]
    pub status: ProposalStatus,
    #[n(3)]
    pub notes: String,
    #[n(4)]
    pub timestamp: TimeStamp<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum FinalizationReason {
    #[n(0)]
    Withdrawn,
    #[n(1)]
    Sold,
    #[n(2)]
    Defective,
}

/// Terminal annotation recording why a batch left active circulation.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Finalization {
    #[n(0)]
    pub reason: FinalizationReason,
    /// Reporting operator public key.
    #[n(1)]
    pub reporter: String,
    #[n(2)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Batch {
    #[n(0)]
    pub id: String,
    /// Owning Company address; changes only on an accepted transfer proposal.
    #[n(1)]
    pub company: String,
    /// ProductType address.
    #[n(2)]
    pub product: String,
    #[n(3)]
    pub properties: Vec<BatchProperty>,
    #[n(4)]
    pub certificates: Vec<Certificate>,
    #[n(5)]
    pub proposals: Vec<Proposal>,
    #[n(6)]
    pub finalization: Option<Finalization>,
    #[n(7)]
    pub timestamp: TimeStamp<Utc>,
}

impl Batch {
    /// Whether any proposal on this batch is still awaiting an answer.
    pub fn has_issued_proposal(&self) -> bool {
        self.proposals
            .iter()
            .any(|p| p.status == ProposalStatus::Issued)
    }

    /// The open proposal matching (sender, receiver). If more than one
    /// matches, the most recently appended one wins.
    pub fn issued_proposal_mut(
        &mut self,
        sender_company: &str,
        receiver_company: &str,
    ) -> Option<&mut Proposal> {
        self.proposals.iter_mut().rev().find(|p| {
            p.sender_company == sender_company
                && p.receiver_company == receiver_company
                && p.status == ProposalStatus::Issued
        })
    }

    /// Append `value` to the property's value history, creating the record on
    /// first use. Record order and value order are both insertion order.
    pub fn record_property_value(&mut self, property_type: &str, value: PropertyValue) {
        match self
            .properties
            .iter_mut()
            .find(|p| p.property_type == property_type)
        {
            Some(record) => record.values.push(value),
            None => self.properties.push(BatchProperty {
                property_type: property_type.to_string(),
                values: vec![value],
            }),
        }
    }
}
