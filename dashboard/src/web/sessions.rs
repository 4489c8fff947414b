use crate::workflow::runner::{AnalysisFailure, AnalysisReport};
use pavecore::upload::AnalysisSession;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

pub const SESSION_COOKIE: &str = "pavesafe_session";

pub type DashboardSession = AnalysisSession<AnalysisReport, AnalysisFailure>;

/// In-memory upload sessions keyed by cookie; least recently used evicted
/// past capacity.
pub struct SessionStore {
    inner: Mutex<StoreInner>,
    capacity: usize,
}

#[derive(Default)]
struct StoreInner {
    sessions: HashMap<String, DashboardSession>,
    order: VecDeque<String>,
}

impl StoreInner {
    /// Moves `id` to the most recently used end.
    fn touch(&mut self, id: &str) {
        if let Some(pos) = self.order.iter().position(|known| known == id) {
            self.order.remove(pos);
        }
        self.order.push_back(id.to_string());
    }

    fn trim(&mut self, capacity: usize) {
        while self.order.len() > capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.sessions.remove(&evicted);
                log::debug!("evicted upload session {evicted}");
            }
        }
    }
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Reuses the cookie's session when known, otherwise starts a new one.
    pub fn resolve(&self, cookie: Option<String>) -> String {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = cookie.filter(|id| inner.sessions.contains_key(id)) {
            inner.touch(&id);
            return id;
        }
        let id = format!("{:032x}", rand::random::<u128>());
        inner.sessions.insert(id.clone(), DashboardSession::new());
        inner.order.push_back(id.clone());
        inner.trim(self.capacity);
        id
    }

    /// Runs `f` against the session, recreating it if it was evicted.
    pub fn with_session<T>(&self, id: &str, f: impl FnOnce(&mut DashboardSession) -> T) -> T {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.touch(id);
        inner.trim(self.capacity);
        let session = inner.sessions.entry(id.to_string()).or_default();
        f(session)
    }

    /// Reads an existing session without creating one.
    pub fn inspect<T>(&self, id: &str, f: impl FnOnce(&DashboardSession) -> T) -> Option<T> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.sessions.get(id).map(f)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pavecore::upload::{SessionState, UploadedFile};

    #[test]
    fn known_cookie_keeps_its_session() {
        let store = SessionStore::new(4);
        let id = store.resolve(None);
        assert_eq!(store.resolve(Some(id.clone())), id);
        assert_ne!(store.resolve(Some("forged".into())), "forged");
    }

    #[test]
    fn sessions_hold_state_between_calls() {
        let store = SessionStore::new(4);
        let id = store.resolve(None);
        let file = UploadedFile::accept("a.png", None, vec![1]).unwrap();
        store.with_session(&id, |s| s.select(file)).unwrap();
        let present = store.with_session(&id, |s| matches!(s.state(), SessionState::FilePresent(_)));
        assert!(present);
        assert_eq!(store.inspect("unknown", |_| ()), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn oldest_sessions_are_evicted_beyond_capacity() {
        let store = SessionStore::new(2);
        let first = store.resolve(None);
        store.resolve(None);
        store.resolve(None);
        assert_eq!(store.len(), 2);
        assert_ne!(store.resolve(Some(first.clone())), first);
    }

    #[test]
    fn active_session_survives_cookieless_visits() {
        let store = SessionStore::new(4);
        let active = store.resolve(None);
        let file = UploadedFile::accept("road.png", None, vec![1]).unwrap();
        store.with_session(&active, |s| s.select(file)).unwrap();

        for _ in 0..64 {
            assert_eq!(store.resolve(Some(active.clone())), active);
            store.resolve(None);
        }
        let present = store.inspect(&active, |s| matches!(s.state(), SessionState::FilePresent(_)));
        assert_eq!(present, Some(true));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn recreated_sessions_respect_capacity() {
        let store = SessionStore::new(2);
        let first = store.resolve(None);
        store.resolve(None);
        store.resolve(None);
        store.with_session(&first, |_| ());
        assert_eq!(store.len(), 2);
        assert_eq!(store.inspect(&first, |_| ()), Some(()));
    }
}
