//! Session Store
//!
//! Holds the active credential and profile in memory and mirrors them to
//! durable slots. Token and profile are only ever present together.

use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use super::storage::{SessionStorageError, SlotStorage, TOKEN_SLOT, USER_SLOT};
use super::types::{Role, Session, UserProfile};

/// Current session plus its durable mirror
pub struct SessionStore {
    storage: Box<dyn SlotStorage>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Create an empty store; call [`SessionStore::init`] to restore a
    /// persisted session.
    pub fn new(storage: impl SlotStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            current: RwLock::new(None),
        }
    }

    /// Restore the persisted session.
    ///
    /// Returns true when both slots were present and the profile decoded.
    /// Storage failures are logged and treated as "no session".
    pub fn init(&self) -> bool {
        let restored = match self.read_persisted() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session");
                None
            }
        };

        let found = restored.is_some();
        if let Some(session) = &restored {
            tracing::debug!(username = %session.profile.username, "Restored session");
        }
        *self.current.write() = restored;
        found
    }

    fn read_persisted(&self) -> Result<Option<Session>, SessionStorageError> {
        let token = self.storage.read(TOKEN_SLOT)?;
        let user = self.storage.read(USER_SLOT)?;

        let (Some(token), Some(user)) = (token, user) else {
            return Ok(None);
        };
        if token.is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<UserProfile>(&user) {
            Ok(profile) => Ok(Some(Session { token, profile })),
            Err(e) => {
                tracing::warn!(error = %e, "Persisted profile is unreadable");
                Ok(None)
            }
        }
    }

    /// Store a new session in memory and in durable storage.
    ///
    /// If either durable write fails, both slots are removed and the store
    /// ends up signed out; the error is returned so the caller can report it.
    pub fn save(&self, token: &str, profile: UserProfile) -> Result<(), SessionStorageError> {
        let encoded = serde_json::to_string(&profile)?;

        *self.current.write() = Some(Session {
            token: token.to_string(),
            profile,
        });

        let persisted = self
            .storage
            .write(USER_SLOT, &encoded)
            .and_then(|()| self.storage.write(TOKEN_SLOT, token));

        if let Err(e) = persisted {
            // A half-written pair could pair one user's token with another's profile
            tracing::warn!(error = %e, "Failed to persist session, signing out");
            self.clear();
            return Err(e);
        }
        Ok(())
    }

    /// Forget the session in memory and in durable storage
    pub fn clear(&self) {
        *self.current.write() = None;

        for slot in [TOKEN_SLOT, USER_SLOT] {
            if let Err(e) = self.storage.remove(slot) {
                tracing::warn!(error = %e, "Failed to remove session slot");
            }
        }
    }

    /// Headers for an outbound API request
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.token() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Stored token is not a valid header value"),
            }
        }

        headers
    }

    pub fn session(&self) -> Option<Session> {
        self.current.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.token.clone())
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.current.read().as_ref().map(|s| s.profile.clone())
    }

    pub fn role(&self) -> Option<Role> {
        self.current.read().as_ref().map(|s| s.profile.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::{FileSlotStorage, MemorySlotStorage};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn alice() -> UserProfile {
        UserProfile::new("u1", "alice", Role::Rider)
    }

    #[test]
    fn test_init_without_persisted_session() {
        let store = SessionStore::new(MemorySlotStorage::new());
        assert!(!store.init());
        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
        assert_eq!(store.profile(), None);
    }

    #[test]
    fn test_save_then_init_after_reload() {
        let slots = MemorySlotStorage::new();
        let store = SessionStore::new(slots.clone());
        store.save("abc", alice()).unwrap();

        let reloaded = SessionStore::new(slots);
        assert!(reloaded.init());
        assert_eq!(reloaded.token().as_deref(), Some("abc"));
        assert_eq!(reloaded.profile(), Some(alice()));
    }

    #[test]
    fn test_file_backed_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(FileSlotStorage::new(dir.path()));
        store
            .save("tok-1", UserProfile::new("u2", "root", Role::Admin))
            .unwrap();

        let reloaded = SessionStore::new(FileSlotStorage::new(dir.path()));
        assert!(reloaded.init());
        assert_eq!(reloaded.role(), Some(Role::Admin));
        assert_eq!(reloaded.token().as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_init_requires_both_slots() {
        let slots = MemorySlotStorage::new();
        slots.write(TOKEN_SLOT, "abc").unwrap();

        let store = SessionStore::new(slots.clone());
        assert!(!store.init());
        assert!(!store.is_authenticated());

        slots.write(USER_SLOT, "not json").unwrap();
        assert!(!store.init());
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let slots = MemorySlotStorage::new();
        let store = SessionStore::new(slots.clone());
        store.save("abc", alice()).unwrap();

        store.clear();
        assert!(!store.is_authenticated());
        assert!(slots.is_empty());

        store.clear();
        assert!(!store.is_authenticated());
        assert!(slots.is_empty());
        assert!(!SessionStore::new(slots).init());
    }

    /// Memory slots whose token writes can be made to fail
    struct FlakySlots {
        inner: MemorySlotStorage,
        fail_token: Arc<AtomicBool>,
    }

    impl SlotStorage for FlakySlots {
        fn read(&self, slot: &str) -> Result<Option<String>, SessionStorageError> {
            self.inner.read(slot)
        }

        fn write(&self, slot: &str, value: &str) -> Result<(), SessionStorageError> {
            if slot == TOKEN_SLOT && self.fail_token.load(Ordering::SeqCst) {
                return Err(SessionStorageError::Io {
                    slot: slot.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.inner.write(slot, value)
        }

        fn remove(&self, slot: &str) -> Result<(), SessionStorageError> {
            self.inner.remove(slot)
        }
    }

    #[test]
    fn test_failed_save_never_mixes_users() {
        let slots = MemorySlotStorage::new();
        let fail_token = Arc::new(AtomicBool::new(false));
        let store = SessionStore::new(FlakySlots {
            inner: slots.clone(),
            fail_token: Arc::clone(&fail_token),
        });
        store.save("alice-token", alice()).unwrap();

        fail_token.store(true, Ordering::SeqCst);
        let result = store.save("root-token", UserProfile::new("u0", "root", Role::Admin));
        assert!(result.is_err());

        // Signed out in memory and on disk; nothing restores
        assert!(!store.is_authenticated());
        assert!(slots.is_empty());
        let reloaded = SessionStore::new(slots);
        assert!(!reloaded.init());
        assert_eq!(reloaded.role(), None);
    }

    #[test]
    fn test_auth_headers() {
        let store = SessionStore::new(MemorySlotStorage::new());

        let headers = store.auth_headers();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());

        store.save("abc", alice()).unwrap();
        let headers = store.auth_headers();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
        assert_eq!(headers.len(), 2);
    }
}
