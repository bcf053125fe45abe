use thiserror::Error;

#[derive(Error, Debug)]
pub enum TierError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration integrity failure. Raised when the tier table is
    /// built, never per evaluation — an engine is only constructed
    /// around a table that already passed validation.
    #[error("Invalid tier table: {reason}")]
    InvalidTierTable { reason: String },

    /// The partner has no closed months to classify. Recoverable:
    /// batch evaluation treats the partner as unranked.
    #[error("Partner '{partner_id}' has no commission history")]
    NoCommissionHistory { partner_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TierResult<T> = Result<T, TierError>;
