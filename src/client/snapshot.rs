use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::auth::AuthState;
use super::error::{ClientError, ClientResult};
use super::storage::LocalStorage;
use crate::models::UserProfile;

pub const SNAPSHOT_KEY: &str = "gymlog.auth_state";

/// The part of the auth state that survives a restart. Tokens are never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAuthState {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    /// Milliseconds since the Unix epoch.
    pub saved_at: i64,
}

pub struct SnapshotStore {
    storage: Arc<dyn LocalStorage>,
    max_age: Duration,
}

impl SnapshotStore {
    pub fn new(storage: Arc<dyn LocalStorage>, max_age: Duration) -> Self {
        Self { storage, max_age }
    }

    pub fn save(&self, state: &AuthState) -> ClientResult<()> {
        self.save_at(state, Utc::now())
    }

    pub fn save_at(&self, state: &AuthState, now: DateTime<Utc>) -> ClientResult<()> {
        let snapshot = PersistedAuthState {
            user: state.user.clone(),
            is_authenticated: state.is_authenticated,
            saved_at: now.timestamp_millis(),
        };
        let json = serde_json::to_string(&snapshot).map_err(ClientError::storage)?;
        self.storage.set_item(SNAPSHOT_KEY, &json)
    }

    pub fn load(&self) -> Option<PersistedAuthState> {
        self.load_at(Utc::now())
    }

    /// Unreadable or expired snapshots are removed and ignored.
    pub fn load_at(&self, now: DateTime<Utc>) -> Option<PersistedAuthState> {
        let raw = self.storage.get_item(SNAPSHOT_KEY)?;

        let snapshot: PersistedAuthState = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Discarding unreadable auth snapshot: {}", e);
                self.clear();
                return None;
            }
        };

        let max_age_ms = i64::try_from(self.max_age.as_millis()).unwrap_or(i64::MAX);
        if now.timestamp_millis().saturating_sub(snapshot.saved_at) > max_age_ms {
            tracing::debug!("Discarding auth snapshot older than {:?}", self.max_age);
            self.clear();
            return None;
        }

        Some(snapshot)
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove_item(SNAPSHOT_KEY) {
            tracing::warn!("Failed to clear auth snapshot: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::storage::MemoryStorage;

    fn signed_in_state() -> AuthState {
        AuthState {
            user: Some(UserProfile {
                id: "u1".to_string(),
                email: "a@b.io".to_string(),
                generating_since: None,
                created_at: Utc::now(),
            }),
            is_authenticated: true,
            ..Default::default()
        }
    }

    fn store() -> (SnapshotStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = SnapshotStore::new(storage.clone(), Duration::from_secs(24 * 60 * 60));
        (store, storage)
    }

    #[test]
    fn test_fresh_snapshot_loads() {
        let (store, _) = store();
        let now = Utc::now();
        store.save_at(&signed_in_state(), now).unwrap();

        let snapshot = store.load_at(now + chrono::Duration::hours(23)).unwrap();
        assert!(snapshot.is_authenticated);
        assert_eq!(snapshot.user.map(|u| u.id).as_deref(), Some("u1"));
    }

    #[test]
    fn test_old_snapshot_discarded() {
        let (store, storage) = store();
        let now = Utc::now();
        store.save_at(&signed_in_state(), now).unwrap();

        assert!(store.load_at(now + chrono::Duration::hours(25)).is_none());
        assert!(storage.get_item(SNAPSHOT_KEY).is_none());
    }

    #[test]
    fn test_corrupt_snapshot_discarded() {
        let (store, storage) = store();
        storage.set_item(SNAPSHOT_KEY, "{\"user\":").unwrap();

        assert!(store.load().is_none());
        assert!(storage.get_item(SNAPSHOT_KEY).is_none());
    }

    #[test]
    fn test_snapshot_never_contains_token() {
        let (store, storage) = store();
        let mut state = signed_in_state();
        state.session = Some(crate::models::AuthSession {
            access_token: "tok-secret".to_string(),
            expires_at: Utc::now(),
        });
        store.save(&state).unwrap();

        let raw = storage.get_item(SNAPSHOT_KEY).unwrap();
        assert!(!raw.contains("tok-secret"));
    }
}
