//! CSRF state tokens for the consent flow.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Issued, not yet consumed state tokens with expiry
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    expiry_duration: Duration,
}

impl StateManager {
    /// Create a new state manager
    ///
    /// # Arguments
    /// * `expiry_seconds` - How long states remain valid (600 = 10 minutes)
    pub fn new(expiry_seconds: i64) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            expiry_duration: Duration::seconds(expiry_seconds),
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generate a new state token (UUID v4) and remember it
    pub fn create_state(&self) -> String {
        let state = Uuid::new_v4().to_string();
        self.states().insert(state.clone(), Utc::now());
        state
    }

    /// Validate and consume a state token
    ///
    /// Single-use: the token is removed whether or not it has expired.
    pub fn validate_and_consume(&self, state: &str) -> bool {
        let Some(created_at) = self.states().remove(state) else {
            return false;
        };
        Utc::now() - created_at <= self.expiry_duration
    }

    /// Drop expired states
    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        let expiry = self.expiry_duration;
        self.states()
            .retain(|_, created_at| now - *created_at <= expiry);
    }

    /// Count of outstanding states
    pub fn count(&self) -> usize {
        self.states().len()
    }
}

/// Background task to periodically clean up expired states
pub async fn run_state_cleanup(manager: StateManager, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        manager.cleanup_expired();
        tracing::debug!("OAuth state cleanup complete, {} states remaining", manager.count());
    }
}
