//! Sign-ins that were started but not yet completed
//!
//! `/api/oauth/login` parks the PKCE verifier and the page to return to under
//! the CSRF state it sends to the portal. The callback takes the entry back
//! out exactly once. Entries expire after ten minutes and are pruned whenever
//! a new sign-in starts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// How long a started sign-in stays valid
pub const PENDING_LOGIN_TTL: Duration = Duration::from_secs(10 * 60);

/// What the callback needs to finish a sign-in
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLogin {
    pub pkce_verifier: String,
    pub return_to: String,
}

#[derive(Debug)]
struct PendingEntry {
    login: PendingLogin,
    created_at: Instant,
}

/// In-memory store of pending sign-ins, keyed by CSRF state
#[derive(Debug, Clone)]
pub struct PendingLogins {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, PendingEntry>>>,
}

impl PendingLogins {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Park a sign-in under its CSRF state, dropping expired entries
    pub async fn insert(&self, state: String, login: PendingLogin) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.created_at) < self.ttl);
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!("Pruned {} expired sign-ins", pruned);
        }

        entries.insert(
            state,
            PendingEntry {
                login,
                created_at: now,
            },
        );
    }

    /// Remove and return the sign-in for `state`, `None` when unknown or expired
    pub async fn take(&self, state: &str) -> Option<PendingLogin> {
        let mut entries = self.entries.lock().await;
        let entry = entries.remove(state)?;

        if entry.created_at.elapsed() < self.ttl {
            Some(entry.login)
        } else {
            None
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl Default for PendingLogins {
    fn default() -> Self {
        Self::new(PENDING_LOGIN_TTL)
    }
}
