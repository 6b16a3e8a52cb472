pub mod credential_store;

pub use credential_store::{
    CookieCredentialStore, CredentialStore, MemoryCredentialStore, TOKEN_COOKIE, TOKEN_TTL_DAYS,
};

use anyhow::Result;
use std::sync::Arc;

/// Shared handle on the session credential. Every authenticated request reads
/// it; only the login, registration and logout flows write it.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn CredentialStore>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new()))
    }

    pub fn init(&self, token: &str) -> Result<()> {
        self.store.set(token)
    }

    pub fn read(&self) -> Option<String> {
        self.store.get()
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }
}
