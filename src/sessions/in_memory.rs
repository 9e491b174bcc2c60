//! In-memory session store implementation.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::traits::{Session, SessionFilter, SessionStore};
use crate::media::SourceKind;

/// An in-memory session store backed by a mutex-protected hash map.
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SourceKind, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: Session) -> Result<()> {
        self.sessions.lock().insert(session.provider, session);
        Ok(())
    }

    async fn get(&self, provider: SourceKind) -> Result<Option<Session>> {
        let sessions = self.sessions.lock();
        Ok(sessions
            .get(&provider)
            .filter(|s| !s.is_expired())
            .cloned())
    }

    async fn expire(&self, provider: SourceKind) -> Result<()> {
        if let Some(session) = self.sessions.lock().get_mut(&provider) {
            session.expire();
        }
        Ok(())
    }

    async fn delete(&self, provider: SourceKind) -> Result<()> {
        self.sessions.lock().remove(&provider);
        Ok(())
    }

    async fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        let sessions = self.sessions.lock();
        let mut results: Vec<Session> = sessions
            .values()
            .filter(|s| {
                if let Some(provider) = filter.provider {
                    if s.provider != provider {
                        return false;
                    }
                }
                filter.include_expired || !s.is_expired()
            })
            .cloned()
            .collect();

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
