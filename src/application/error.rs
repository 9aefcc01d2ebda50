use thiserror::Error;

use crate::domain::BeneficiaryId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid IBAN: {0}")]
    InvalidIban(String),

    #[error("First and last name are required")]
    MissingName,

    #[error("Beneficiary not found: {0}")]
    BeneficiaryNotFound(BeneficiaryId),

    #[error("Storage read failed: {0}")]
    StorageRead(#[source] anyhow::Error),

    #[error("Storage write failed: {0}")]
    StorageWrite(#[source] anyhow::Error),
}

impl AppError {
    /// Storage failures leave the in-memory state usable; validation
    /// failures block the operation that raised them.
    pub fn is_storage(&self) -> bool {
        matches!(self, AppError::StorageRead(_) | AppError::StorageWrite(_))
    }
}
