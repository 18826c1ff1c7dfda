use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    auth::TokenProvider,
    models::{AppRole, UserProfile},
};

use super::KeyValueStore;

const ENABLE_LOGS: bool = true;

use crate::log_error;

pub struct StorageKeys {
    pub auth_token: &'static str,
    pub user_data: &'static str,
    pub selected_role: &'static str,
}

pub const STORAGE_KEYS: StorageKeys = StorageKeys {
    auth_token: "busbeacon_auth_token",
    user_data: "busbeacon_user_data",
    selected_role: "busbeacon_selected_role",
};

/// Typed access to the signed-in session kept in local storage.
#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save_auth_token(&self, token: &str) -> Result<()> {
        self.store.set(STORAGE_KEYS.auth_token, token)
    }

    pub fn auth_token(&self) -> Result<Option<String>> {
        self.store.get(STORAGE_KEYS.auth_token)
    }

    pub fn remove_auth_token(&self) -> Result<()> {
        self.store.remove(STORAGE_KEYS.auth_token)
    }

    pub fn save_user(&self, user: &UserProfile) -> Result<()> {
        let serialized = serde_json::to_string(user)?;
        self.store.set(STORAGE_KEYS.user_data, &serialized)
    }

    pub fn user(&self) -> Result<Option<UserProfile>> {
        match self.store.get(STORAGE_KEYS.user_data)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .context("stored user data is not valid JSON"),
            None => Ok(None),
        }
    }

    pub fn save_selected_role(&self, role: AppRole) -> Result<()> {
        self.store.set(STORAGE_KEYS.selected_role, role.as_str())
    }

    pub fn selected_role(&self) -> Result<Option<AppRole>> {
        Ok(self
            .store
            .get(STORAGE_KEYS.selected_role)?
            .as_deref()
            .and_then(AppRole::from_wire))
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Removes every session key; used on sign-out.
    pub fn clear_all(&self) -> Result<()> {
        for key in [
            STORAGE_KEYS.auth_token,
            STORAGE_KEYS.user_data,
            STORAGE_KEYS.selected_role,
        ] {
            self.store.remove(key)?;
        }
        Ok(())
    }
}

impl TokenProvider for SessionStorage {
    fn token(&self) -> Option<String> {
        match self.auth_token() {
            Ok(token) => token.filter(|value| !value.is_empty()),
            Err(err) => {
                log_error!("Error reading auth token: {err:?}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn session_roundtrip_and_clear() {
        let storage = SessionStorage::new(Arc::new(MemoryStore::new()));
        assert!(!storage.is_authenticated());

        storage.save_auth_token("jwt-1").unwrap();
        storage
            .save_user(&UserProfile {
                id: "1".into(),
                name: "Agni Kumar".into(),
                roles: vec![AppRole::Attender],
                ..Default::default()
            })
            .unwrap();
        storage.save_selected_role(AppRole::Attender).unwrap();

        assert_eq!(storage.token().as_deref(), Some("jwt-1"));
        assert_eq!(storage.user().unwrap().unwrap().name, "Agni Kumar");
        assert_eq!(storage.selected_role().unwrap(), Some(AppRole::Attender));

        storage.clear_all().unwrap();
        assert!(!storage.is_authenticated());
        assert!(storage.user().unwrap().is_none());
        assert!(storage.selected_role().unwrap().is_none());
    }
}
