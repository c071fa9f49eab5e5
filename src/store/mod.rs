//! Key-value storage holding the shared report slot.
//!
//! A store behaves like browser local storage: string keys, string values,
//! whole-value writes, and a change feed that tells each context about writes
//! made by *other* contexts only.

pub mod file;
pub mod memory;
pub mod slot;

use std::{io, path::PathBuf};

use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use slot::ReportSlot;

pub(crate) const EVENT_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to watch storage directory: {0}")]
    Watch(#[from] notify::Error),
}

/// Identifies the execution context (tab, process) that made a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

impl ContextId {
    /// Writes observed from outside this process.
    pub const EXTERNAL: ContextId = ContextId(0);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub origin: ContextId,
}

pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Change feed for writes made by other contexts.
    fn subscribe(&self) -> StorageEvents;
}

/// Receiving half of a store's change feed, filtered to foreign writes.
pub struct StorageEvents {
    rx: broadcast::Receiver<StorageEvent>,
    context: ContextId,
}

impl StorageEvents {
    pub(crate) fn new(rx: broadcast::Receiver<StorageEvent>, context: ContextId) -> Self {
        Self { rx, context }
    }

    /// Waits for the next foreign write. `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.origin == self.context => continue,
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("storage listener lagged, skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("civicReports").is_ok());
        assert!(validate_key("civic-reports_2").is_ok());
        assert!(matches!(validate_key(""), Err(StoreError::InvalidKey(_))));
        assert!(matches!(validate_key("../etc"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(validate_key("civic reports"), Err(StoreError::InvalidKey(_))));
    }
}
