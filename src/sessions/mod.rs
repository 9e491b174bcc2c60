//! Session management. Holds provider access tokens for the caller.

pub mod in_memory;
pub mod traits;

pub use in_memory::InMemorySessionStore;
pub use traits::{Session, SessionFilter, SessionStore};

/// Create a default in-memory session store.
pub fn create_session_store() -> Box<dyn SessionStore> {
    Box::new(InMemorySessionStore::new())
}
