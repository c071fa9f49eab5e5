use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("stored reports are not valid JSON: {0}")]
    MalformedReports(#[from] serde_json::Error),
    #[error("dashboard sync is already running")]
    AlreadyRunning,
}
