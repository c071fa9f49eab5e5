use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tempfile::NamedTempFile;
use tokio::sync::broadcast;

use super::{
    validate_key, ContextId, KeyValueStore, StorageEvent, StorageEvents, StoreError,
    EVENT_CAPACITY,
};

const OWN_CONTEXT: ContextId = ContextId(1);

type LastSeen = Arc<Mutex<HashMap<String, String>>>;

/// Directory-backed store, one `<key>.json` file per key.
///
/// Writes from other processes (the mobile app, a second dashboard) are picked
/// up by a filesystem watcher and published on the change feed.
pub struct FileStore {
    dir: PathBuf,
    events: broadcast::Sender<StorageEvent>,
    last_seen: LastSeen,
    _watcher: Option<RecommendedWatcher>,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let last_seen: LastSeen = Arc::new(Mutex::new(HashMap::new()));

        let watcher = match start_watcher(&dir, events.clone(), Arc::clone(&last_seen)) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(
                    "{}. Continuing without change notifications, polling still works.",
                    e
                );
                None
            }
        };

        tracing::debug!("file store opened at {}", dir.display());
        Ok(Self {
            dir,
            events,
            last_seen,
            _watcher: watcher,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Each write goes through its own temp file, so concurrent writers never
    /// publish each other's partial contents.
    fn write_atomic(&self, path: &Path, value: &str) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(value.as_bytes()).map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    fn remember(&self, key: &str, value: Option<String>) -> Option<String> {
        let mut seen = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        match value {
            Some(value) => seen.insert(key.to_string(), value),
            None => seen.remove(key),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let path = self.path_for(key);

        // Recorded before the rename so the watcher treats it as our own echo;
        // restored if the write does not land.
        let previous = self.remember(key, Some(value.to_string()));
        if let Err(e) = self.write_atomic(&path, value) {
            self.remember(key, previous);
            return Err(e);
        }
        Ok(())
    }

    fn subscribe(&self) -> StorageEvents {
        StorageEvents::new(self.events.subscribe(), OWN_CONTEXT)
    }
}

fn start_watcher(
    dir: &Path,
    events: broadcast::Sender<StorageEvent>,
    last_seen: LastSeen,
) -> Result<RecommendedWatcher, StoreError> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            if !(event.kind.is_create() || event.kind.is_modify()) {
                return;
            }
            for path in &event.paths {
                if let Some(change) = observe_change(path, &last_seen) {
                    let _ = events.send(change);
                }
            }
        }
        Err(e) => tracing::warn!("storage watcher error: {}", e),
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Turns a filesystem change into a storage event, unless the file now holds
/// exactly what was last written or observed for that key.
fn observe_change(path: &Path, last_seen: &LastSeen) -> Option<StorageEvent> {
    let key = key_for_path(path)?;
    let contents = fs::read_to_string(path).ok()?;

    let mut seen = last_seen.lock().unwrap_or_else(|e| e.into_inner());
    if seen.get(&key) == Some(&contents) {
        return None;
    }
    seen.insert(key.clone(), contents);
    Some(StorageEvent {
        key,
        origin: ContextId::EXTERNAL,
    })
}

fn key_for_path(path: &Path) -> Option<String> {
    if path.extension()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    validate_key(stem).ok()?;
    Some(stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_item() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path().join("data")).unwrap();

        assert_eq!(store.get_item("civicReports").unwrap(), None);
        store.set_item("civicReports", "[]").unwrap();
        assert_eq!(store.get_item("civicReports").unwrap().as_deref(), Some("[]"));

        let on_disk = fs::read_to_string(store.dir().join("civicReports.json")).unwrap();
        assert_eq!(on_disk, "[]");
        let leftovers = fs::read_dir(store.dir()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_concurrent_writers_never_publish_partial_values() {
        let tmp = tempfile::tempdir().unwrap();
        let a = FileStore::open(tmp.path()).unwrap();
        let b = FileStore::open(tmp.path()).unwrap();
        let value_a = format!("[{}]", "1,".repeat(50_000) + "1");
        let value_b = format!("[{}]", "2,".repeat(70_000) + "2");

        std::thread::scope(|scope| {
            let writer_a = scope.spawn(|| {
                for _ in 0..50 {
                    a.set_item("civicReports", &value_a).unwrap();
                }
            });
            let writer_b = scope.spawn(|| {
                for _ in 0..50 {
                    b.set_item("civicReports", &value_b).unwrap();
                }
            });
            while !(writer_a.is_finished() && writer_b.is_finished()) {
                if let Some(current) = a.get_item("civicReports").unwrap() {
                    assert!(current == value_a || current == value_b, "partial value observed");
                }
            }
        });

        let last = a.get_item("civicReports").unwrap().unwrap();
        assert!(last == value_a || last == value_b);
    }

    #[test]
    fn test_failed_write_does_not_mask_later_foreign_write() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("data");
        let store = FileStore::open(&dir).unwrap();

        fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(
            store.set_item("civicReports", "[1]"),
            Err(StoreError::Io { .. })
        ));
        assert!(store.last_seen.lock().unwrap().get("civicReports").is_none());

        // Another process then writes the very same value.
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("civicReports.json");
        fs::write(&path, "[1]").unwrap();
        let event = observe_change(&path, &store.last_seen).unwrap();
        assert_eq!(event.key, "civicReports");
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        assert!(matches!(
            store.set_item("../escape", "[]"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get_item("a/b"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_key_for_path() {
        assert_eq!(
            key_for_path(Path::new("/data/civicReports.json")).as_deref(),
            Some("civicReports")
        );
        assert_eq!(key_for_path(Path::new("/data/.civicReports.json.tmp")), None);
        assert_eq!(key_for_path(Path::new("/data/notes.txt")), None);
    }

    #[test]
    fn test_observe_change_skips_own_writes_and_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("civicReports.json");
        let last_seen: LastSeen = Arc::new(Mutex::new(HashMap::new()));

        fs::write(&path, "[1]").unwrap();
        last_seen
            .lock()
            .unwrap()
            .insert("civicReports".to_string(), "[1]".to_string());
        assert_eq!(observe_change(&path, &last_seen), None);

        fs::write(&path, "[1,2]").unwrap();
        let event = observe_change(&path, &last_seen).unwrap();
        assert_eq!(event.key, "civicReports");
        assert_eq!(event.origin, ContextId::EXTERNAL);

        // A second notification for the same contents is collapsed.
        assert_eq!(observe_change(&path, &last_seen), None);
    }
}
