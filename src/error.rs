/// Rejection taxonomy for transaction validation.
///
/// Every variant carries a human-readable reason for audit and debugging.
/// Handlers abort on the first failing check, so a rejected transaction maps
/// to exactly one of these. Rejections are never retried by the core.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("missing field: {0}")]
    MissingField(String),
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
    #[error("identity conflict: {0}")]
    IdentityConflict(String),
    #[error("unknown reference: {0}")]
    UnknownReference(String),
    #[error("not enabled: {0}")]
    NotEnabled(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("state conflict: {0}")]
    StateConflict(String),
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),
    /// The state access port itself failed. Fatal for the invocation, not a
    /// validation outcome.
    #[error("ledger access failed: {0}")]
    Ledger(String),
}
