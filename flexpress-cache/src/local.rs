use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use flexpress_domain::matching::{CharterCandidate, MatchSearchDraft, TravelMatch};

use crate::ledger::LedgerSnapshot;

/// Storage key for the persisted credit-notification log.
pub const NOTIFICATIONS_KEY: &str = "flexpress-notifications";
/// Storage key for the draft search form and last known match/charters.
pub const TRAVEL_MATCH_KEY: &str = "flexpress-travel-match";
/// Storage key for the persisted session (user + token).
pub const SESSION_KEY: &str = "flexpress-session";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend failed: {0}")]
    Backend(String),

    #[error("corrupt value under {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Key/value persistence seam. Single writer per tab; concurrent tabs are
/// last-write-wins.
pub trait StorageBackend: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn store(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

fn load_json<T: DeserializeOwned>(
    backend: &dyn StorageBackend,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match backend.load(key)? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt { key: key.to_string(), source }),
    }
}

fn store_json<T: Serialize>(
    backend: &dyn StorageBackend,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Corrupt {
        key: key.to_string(),
        source,
    })?;
    backend.store(key, &raw)
}

/// The persisted travel-match draft: the search form plus the last known
/// match and candidate list, so a reload can resume where the user was.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TravelMatchDraft {
    pub search: MatchSearchDraft,
    pub last_match: Option<TravelMatch>,
    pub charters: Vec<CharterCandidate>,
}

/// Persisted local stores. Construction does no I/O; hydration is an
/// explicit step invoked once after startup so the first render always shows
/// default state (no storage/server mismatch at mount).
pub struct LocalStores {
    backend: Arc<dyn StorageBackend>,
}

impl LocalStores {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn hydrate_ledger(&self) -> Result<Option<LedgerSnapshot>, StorageError> {
        let snapshot = load_json(self.backend.as_ref(), NOTIFICATIONS_KEY)?;
        if snapshot.is_some() {
            info!("notification log hydrated from storage");
        }
        Ok(snapshot)
    }

    pub fn persist_ledger(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
        store_json(self.backend.as_ref(), NOTIFICATIONS_KEY, snapshot)
    }

    pub fn hydrate_draft(&self) -> Result<Option<TravelMatchDraft>, StorageError> {
        load_json(self.backend.as_ref(), TRAVEL_MATCH_KEY)
    }

    pub fn persist_draft(&self, draft: &TravelMatchDraft) -> Result<(), StorageError> {
        store_json(self.backend.as_ref(), TRAVEL_MATCH_KEY, draft)
    }

    pub fn clear_draft(&self) -> Result<(), StorageError> {
        self.backend.remove(TRAVEL_MATCH_KEY)
    }

    pub fn hydrate_session(&self) -> Result<Option<PersistedSession>, StorageError> {
        load_json(self.backend.as_ref(), SESSION_KEY)
    }

    pub fn persist_session(&self, session: &PersistedSession) -> Result<(), StorageError> {
        store_json(self.backend.as_ref(), SESSION_KEY, session)
    }

    pub fn clear_session(&self) -> Result<(), StorageError> {
        self.backend.remove(SESSION_KEY)
    }
}

/// What survives of a session across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub user_id: Uuid,
    pub token: String,
}
