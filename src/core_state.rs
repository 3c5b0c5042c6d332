//! Application state shared by every request handler.
//!
//! `CoreState` owns the database location, the loaded disease catalog and
//! the in-memory bearer-token sessions. Connections are opened per request.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::db;
use crate::diagnosis::DiseaseCatalog;

/// Sessions idle longer than one shift are dropped.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);

// ═══════════════════════════════════════════════════════════
// Tokens
// ═══════════════════════════════════════════════════════════

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// ═══════════════════════════════════════════════════════════
// SessionRegistry
// ═══════════════════════════════════════════════════════════

#[derive(Debug)]
struct SessionEntry {
    user_id: i64,
    last_seen: Instant,
}

/// Bearer tokens mapped to user ids. Only token hashes are stored.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<[u8; 32], SessionEntry>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
        }
    }

    /// Issue a fresh token for `user_id`. The plain token is returned once.
    pub fn issue(&mut self, user_id: i64) -> String {
        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            SessionEntry {
                user_id,
                last_seen: Instant::now(),
            },
        );
        token
    }

    /// Resolve a token to its user id and refresh its idle timer.
    pub fn validate(&mut self, token: &str) -> Option<i64> {
        let hash = hash_token(token);
        let expired = match self.sessions.get_mut(&hash) {
            None => return None,
            Some(entry) if entry.last_seen.elapsed() > self.idle_timeout => true,
            Some(entry) => {
                entry.last_seen = Instant::now();
                return Some(entry.user_id);
            }
        };
        if expired {
            self.sessions.remove(&hash);
            tracing::debug!("Dropped idle session");
        }
        None
    }

    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    /// Drop every session of a user. Returns how many were removed.
    pub fn revoke_user(&mut self, user_id: i64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.user_id != user_id);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_IDLE_TIMEOUT)
    }
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    db_path: PathBuf,
    catalog: Arc<DiseaseCatalog>,
    sessions: RwLock<SessionRegistry>,
}

impl CoreState {
    pub fn new(db_path: PathBuf, catalog: DiseaseCatalog) -> Self {
        Self {
            db_path,
            catalog: Arc::new(catalog),
            sessions: RwLock::new(SessionRegistry::default()),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a database connection. Most common operation in handlers.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    pub fn catalog(&self) -> &DiseaseCatalog {
        &self.catalog
    }

    pub fn issue_token(&self, user_id: i64) -> Result<String, CoreError> {
        let mut sessions = self.sessions.write().map_err(|_| CoreError::LockPoisoned)?;
        Ok(sessions.issue(user_id))
    }

    pub fn validate_token(&self, token: &str) -> Result<Option<i64>, CoreError> {
        let mut sessions = self.sessions.write().map_err(|_| CoreError::LockPoisoned)?;
        Ok(sessions.validate(token))
    }

    pub fn revoke_user_sessions(&self, user_id: i64) -> Result<usize, CoreError> {
        let mut sessions = self.sessions.write().map_err(|_| CoreError::LockPoisoned)?;
        Ok(sessions.revoke_user(user_id))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}
