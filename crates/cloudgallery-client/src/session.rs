//! Session token lifecycle.
//!
//! # Design
//! - The token lives in one explicit [`SessionContext`] that is handed to the
//!   API layer, never read from ambient storage.
//! - Persistence sits behind [`TokenStore`] so tests run against memory.
//! - [`SessionContext::expire`] clears at most once per token, so concurrent
//!   401 responses produce a single logout.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

const EVENT_CAPACITY: usize = 16;

/// Persistent storage for the bearer token.
pub trait TokenStore: Send + Sync {
    /// Load the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be read.
    fn load(&self) -> ClientResult<Option<String>>;

    /// Persist a token, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be written.
    fn save(&self, token: &str) -> ClientResult<()>;

    /// Remove the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be modified.
    fn clear(&self) -> ClientResult<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
}

/// JSON file store (`{"token": "..."}`).
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store rooted at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn session_error(&self, source: io::Error) -> ClientError {
        ClientError::Session {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.session_error(err)),
        };
        let stored: StoredSession = serde_json::from_str(&raw)
            .map_err(|err| self.session_error(io::Error::new(io::ErrorKind::InvalidData, err)))?;
        let token = stored.token.trim().to_string();
        Ok((!token.is_empty()).then_some(token))
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.session_error(err))?;
        }
        let body = serde_json::to_vec(&StoredSession {
            token: token.to_string(),
        })
        .map_err(|err| self.session_error(io::Error::new(io::ErrorKind::InvalidData, err)))?;
        fs::write(&self.path, body).map_err(|err| self.session_error(err))
    }

    fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.session_error(err)),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Store pre-seeded with `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A token was obtained and stored.
    Established,
    /// The user logged out.
    LoggedOut,
    /// The backend rejected the token.
    Expired,
}

struct SessionInner {
    store: Box<dyn TokenStore>,
    token: Mutex<Option<String>>,
    events: broadcast::Sender<SessionEvent>,
}

/// Shared session handle injected into the API layer and views.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Initialise the session from a store, loading any persisted token.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be read.
    pub fn init(store: impl TokenStore + 'static) -> ClientResult<Self> {
        let token = store.load()?;
        debug!(authenticated = token.is_some(), "session initialised");
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(SessionInner {
                store: Box::new(store),
                token: Mutex::new(token),
                events,
            }),
        })
    }

    /// Session backed by a fresh [`MemoryTokenStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                store: Box::new(MemoryTokenStore::default()),
                token: Mutex::new(None),
                events,
            }),
        }
    }

    /// Current bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Whether a token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    /// Store a freshly issued token.
    ///
    /// # Errors
    ///
    /// Returns an error when the token cannot be persisted; the in-memory
    /// session is left unchanged in that case.
    pub fn establish(&self, token: impl Into<String>) -> ClientResult<()> {
        let token = token.into();
        let mut guard = self.lock();
        self.inner.store.save(&token)?;
        *guard = Some(token);
        drop(guard);
        info!("session established");
        self.emit(SessionEvent::Established);
        Ok(())
    }

    /// Clear the token at the user's request.
    ///
    /// # Errors
    ///
    /// Returns an error when the persisted token cannot be removed; the
    /// in-memory token is cleared regardless.
    pub fn logout(&self) -> ClientResult<()> {
        self.lock().take();
        let result = self.inner.store.clear();
        info!("session cleared by logout");
        self.emit(SessionEvent::LoggedOut);
        result
    }

    /// Clear the token after the backend rejected it.
    ///
    /// Returns `true` only for the call that actually removed a token.
    pub fn expire(&self) -> bool {
        let removed = self.lock().take().is_some();
        if removed {
            if let Err(err) = self.inner.store.clear() {
                warn!(error = %err, "failed to remove persisted token");
            }
            self.emit(SessionEvent::Expired);
        }
        removed
    }

    /// Subscribe to lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.inner
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_token_under_fixed_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("session.json");
        let store = FileTokenStore::new(&path);
        assert_eq!(store.load().expect("load"), None);

        store.save("abc123").expect("save");
        let raw = fs::read_to_string(&path).expect("read");
        let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(json["token"], "abc123");
        assert_eq!(store.load().expect("load").as_deref(), Some("abc123"));

        store.clear().expect("clear");
        store.clear().expect("clear twice");
        assert!(!path.exists());
    }

    #[test]
    fn corrupted_session_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").expect("write");
        let err = FileTokenStore::new(&path).load().expect_err("corrupt");
        assert!(matches!(err, ClientError::Session { .. }));
    }

    #[test]
    fn init_loads_persisted_token() {
        let session = SessionContext::init(MemoryTokenStore::with_token("t1")).expect("init");
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("t1"));
    }

    #[test]
    fn expire_clears_exactly_once() {
        let session = SessionContext::init(MemoryTokenStore::with_token("t1")).expect("init");
        let mut events = session.subscribe();
        assert!(session.expire());
        assert!(!session.expire());
        assert!(!session.is_authenticated());
        assert_eq!(events.try_recv().expect("event"), SessionEvent::Expired);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn establish_and_logout_emit_events() {
        let session = SessionContext::in_memory();
        let mut events = session.subscribe();
        session.establish("fresh").expect("establish");
        assert_eq!(session.token().as_deref(), Some("fresh"));
        session.logout().expect("logout");
        assert!(!session.is_authenticated());
        assert_eq!(events.try_recv().expect("event"), SessionEvent::Established);
        assert_eq!(events.try_recv().expect("event"), SessionEvent::LoggedOut);
    }
}
