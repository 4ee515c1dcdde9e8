use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Live admin sessions, keyed by the random id carried in the session cookie.
///
/// A cookie only grants access while its id is present here and younger than
/// the configured lifetime; logout and password changes remove ids.
#[derive(Debug, Clone)]
pub struct SessionStore {
    ttl: Duration,
    live: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            live: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Register a new session and return its id.
    pub fn issue(&self) -> String {
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        let id = hex::encode(raw);

        let now = Utc::now();
        let mut live = self.lock();
        live.retain(|_, issued| !expired(*issued, self.ttl, now));
        live.insert(id.clone(), now);
        debug!(live = live.len(), "admin session issued");
        id
    }

    /// Whether `id` names a session that was issued, not revoked, and not expired.
    pub fn is_live(&self, id: &str) -> bool {
        let now = Utc::now();
        let mut live = self.lock();
        match live.get(id) {
            Some(issued) if !expired(*issued, self.ttl, now) => true,
            Some(_) => {
                live.remove(id);
                debug!("admin session expired");
                false
            }
            None => false,
        }
    }

    pub fn revoke(&self, id: &str) {
        if self.lock().remove(id).is_some() {
            info!("admin session ended");
        }
    }

    pub fn revoke_all(&self) {
        let mut live = self.lock();
        let count = live.len();
        live.clear();
        info!(count, "all admin sessions ended");
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn expired(issued: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    issued + ttl <= now
}
