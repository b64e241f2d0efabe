use adsync_core::StoreError;
use adsync_meta::MetaError;
use thiserror::Error;

use crate::outcome::CREDENTIALS_MISSING_MESSAGE;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Bad input; no remote call was made.
    #[error("{0}")]
    Validation(String),

    #[error("{}", CREDENTIALS_MISSING_MESSAGE)]
    CredentialsMissing,

    #[error("campaign not found")]
    NotFound,

    /// Only raised where the remote result is the operation's product
    /// (listing during sync).
    #[error("{0}")]
    Remote(#[from] MetaError),

    #[error("persistence failure: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => SyncError::NotFound,
            other => SyncError::Persistence(other),
        }
    }
}
