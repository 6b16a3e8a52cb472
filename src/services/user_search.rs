use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

use super::error_handling::LogHelper;
use super::gateway::UserDirectory;
use crate::domain::user::User;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);

/// Member lookup by email for the project edit view.
///
/// Each call waits out the debounce window first; a call overtaken by a newer
/// one resolves to `None` and never reaches the server, or has its late
/// response discarded.
pub struct UserSearch {
    directory: Arc<dyn UserDirectory>,
    debounce: Duration,
    generation: AtomicU64,
}

impl UserSearch {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self::with_debounce(directory, SEARCH_DEBOUNCE)
    }

    pub fn with_debounce(directory: Arc<dyn UserDirectory>, debounce: Duration) -> Self {
        Self {
            directory,
            debounce,
            generation: AtomicU64::new(0),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Option<Vec<User>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim();
        if query.is_empty() {
            return Some(Vec::new());
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(generation) {
            debug!("Search superseded before sending");
            return None;
        }

        let result = self.directory.search_by_email(query).await;
        if !self.is_current(generation) {
            debug!("Discarding stale search response");
            return None;
        }
        match result {
            Ok(users) => Some(users),
            Err(e) => {
                LogHelper::log_request_failure("search_users", &e);
                Some(Vec::new())
            }
        }
    }
}
