use anyhow::{anyhow, Context, Result};
use std::{collections::BTreeMap, fs, path::PathBuf, sync::RwLock};

use super::KeyValueStore;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Key-value store persisted as one pretty-printed JSON object.
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read storage from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!("Discarding unreadable storage file {}: {err}", path.display());
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create storage directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write storage to {}", self.path.display()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self
            .data
            .read()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        guard.insert(key.to_string(), value.to_string());
        self.persist(&guard)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        if guard.remove(key).is_some() {
            self.persist(&guard)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("busbeacon-store-{}.json", Uuid::new_v4()))
    }

    #[test]
    fn values_survive_reopen() {
        let path = temp_path();
        {
            let store = JsonFileStore::new(path.clone()).unwrap();
            store.set("busbeacon_auth_token", "abc").unwrap();
            store.set("other", "1").unwrap();
            store.remove("other").unwrap();
        }

        let reopened = JsonFileStore::new(path.clone()).unwrap();
        assert_eq!(
            reopened.get("busbeacon_auth_token").unwrap().as_deref(),
            Some("abc")
        );
        assert_eq!(reopened.get("other").unwrap(), None);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let path = temp_path();
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(path.clone()).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);

        let _ = fs::remove_file(path);
    }
}
