use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use tokio::sync::broadcast;

use super::{
    validate_key, ContextId, KeyValueStore, StorageEvent, StorageEvents, StoreError,
    EVENT_CAPACITY,
};

struct Shared {
    items: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    next_context: AtomicU64,
}

/// In-process store. Every handle returned by [`MemoryStore::context`] sees the
/// same data but acts as a separate tab for change notifications.
pub struct MemoryStore {
    shared: Arc<Shared>,
    context: ContextId,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                items: Mutex::new(HashMap::new()),
                events,
                next_context: AtomicU64::new(2),
            }),
            context: ContextId(1),
        }
    }

    /// Opens another context over the same storage.
    pub fn context(&self) -> Self {
        let id = self.shared.next_context.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
            context: ContextId(id),
        }
    }

    pub fn context_id(&self) -> ContextId {
        self.context
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let items = self.shared.items.lock().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let changed = {
            let mut items = self.shared.items.lock().unwrap_or_else(|e| e.into_inner());
            items.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        };
        if changed {
            // No receivers is fine.
            let _ = self.shared.events.send(StorageEvent {
                key: key.to_string(),
                origin: self.context,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> StorageEvents {
        StorageEvents::new(self.shared.events.subscribe(), self.context)
    }
}
