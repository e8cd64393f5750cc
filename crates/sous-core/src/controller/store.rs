//! Registry of live sessions.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::session::SessionHandle;

/// Maps session ids to live session handles.
///
/// The controller only ever talks to this trait, so tests and embedders can
/// supply their own registry instead of a process-wide one.
pub trait SessionStore: Send + Sync {
    fn insert(&self, handle: Arc<SessionHandle>);

    fn get(&self, session_id: &str) -> Option<Arc<SessionHandle>>;

    /// Removes and returns the handle. Exactly one of several concurrent
    /// callers receives it.
    fn remove(&self, session_id: &str) -> Option<Arc<SessionHandle>>;

    fn handles(&self) -> Vec<Arc<SessionHandle>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Default store: a map behind a read-write lock.
///
/// The lock is only held for map operations, never across an await point. A
/// poisoned lock is recovered since the map itself cannot be left torn.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, handle: Arc<SessionHandle>) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(handle.id().to_string(), handle);
    }

    fn get(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(session_id).cloned()
    }

    fn remove(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(session_id)
    }

    fn handles(&self) -> Vec<Arc<SessionHandle>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
