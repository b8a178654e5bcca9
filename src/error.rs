use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RentLedgerError {
    #[error("{what} not found: {context}")]
    NotFound { what: &'static str, context: String },

    #[error("{what} already exists: {context}")]
    AlreadyExists { what: &'static str, context: String },

    #[error("Invalid {field}: {details}")]
    InvalidInput { field: String, details: String },

    #[error("Stored rental data is corrupt: {0}")]
    DataCorruption(String),

    #[error("Balance mismatch for {building} - {tenant}: ledger ({ledger_balance}) != flat ({flat_balance})")]
    BalanceMismatch {
        building: String,
        tenant: String,
        ledger_balance: Decimal,
        flat_balance: Decimal,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse classification callers use to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidInput,
    DataCorruption,
    Other,
}

impl RentLedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::DataCorruption(_) | Self::SerializationError(_) => ErrorKind::DataCorruption,
            Self::BalanceMismatch { .. } | Self::IoError(_) => ErrorKind::Other,
        }
    }

    pub(crate) fn building_not_found(building: &str) -> Self {
        Self::NotFound {
            what: "Building",
            context: building.to_string(),
        }
    }

    pub(crate) fn tenant_not_found(building: &str, tenant: &str) -> Self {
        Self::NotFound {
            what: "Tenant",
            context: format!("{} - {}", building, tenant),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RentLedgerError>;
