//! Access gate: operator login and session checks
//!
//! The dispatcher never sees credentials. Callers obtain an `Operator` from
//! `SessionGate::authorize` and pass its name in as the audit actor.

use std::collections::HashMap;
use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::OperatorConfig;
use crate::error::{AccessError, CoreError};

/// Identity admitted by the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    /// Login name
    pub username: String,
}

/// An issued session
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque bearer token
    pub token: String,
    /// Who logged in
    pub operator: Operator,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Password login backed by Argon2 hashes, with in-memory sessions
pub struct SessionGate {
    /// Username to PHC hash
    operators: HashMap<String, String>,
    /// Verified against when the username is unknown, so both paths cost the same
    dummy_hash: String,
    /// Session lifetime
    ttl: TimeDelta,
    /// Live sessions by token
    sessions: RwLock<HashMap<String, Session>>,
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("operators", &self.operators.keys().collect::<Vec<_>>())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionGate {
    /// Build the gate from configured operators
    ///
    /// # Errors
    /// Returns `CoreError` if no operators are configured, a username repeats,
    /// a hash is not a valid PHC string, or the TTL is too large to add to
    /// the current time
    pub fn new(operators: &[OperatorConfig], ttl: Duration) -> Result<Self, CoreError> {
        if operators.is_empty() {
            return Err(CoreError::NoOperators);
        }

        let mut by_name = HashMap::with_capacity(operators.len());
        for op in operators {
            PasswordHash::new(&op.password_hash).map_err(|e| {
                CoreError::ConfigError(format!("invalid password hash for {}: {e}", op.username))
            })?;
            if by_name
                .insert(op.username.clone(), op.password_hash.clone())
                .is_some()
            {
                return Err(CoreError::DuplicateOperator(op.username.clone()));
            }
        }

        let ttl = TimeDelta::from_std(ttl)
            .map_err(|e| CoreError::ConfigError(format!("session ttl out of range: {e}")))?;
        if Utc::now().checked_add_signed(ttl).is_none() {
            return Err(CoreError::ConfigError(
                "session ttl out of range: expiry overflows".to_string(),
            ));
        }

        let dummy_hash = Self::hash_password(&Uuid::new_v4().to_string())
            .map_err(|e| CoreError::ConfigError(e.to_string()))?;

        Ok(Self {
            operators: by_name,
            dummy_hash,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Check credentials and open a session
    ///
    /// # Errors
    /// Returns `AccessError::Denied` for an unknown user or wrong password
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AccessError> {
        let known = self.operators.get(username);
        let hash = known.unwrap_or(&self.dummy_hash).clone();
        let verified = verify_password(hash, password.to_string()).await?;

        if known.is_none() {
            warn!(username = %username, "login for unknown operator");
            return Err(AccessError::Denied);
        }
        if !verified {
            warn!(username = %username, "login with wrong password");
            return Err(AccessError::Denied);
        }

        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            operator: Operator {
                username: username.to_string(),
            },
            expires_at,
        };

        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());

        info!(username = %username, expires_at = %session.expires_at, "operator logged in");

        Ok(session)
    }

    /// Admit a request carrying `token`
    ///
    /// # Errors
    /// Returns `AccessError::Denied` if the token is unknown, revoked or expired
    pub async fn authorize(&self, token: &str) -> Result<Operator, AccessError> {
        let now = Utc::now();

        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                None => return Err(AccessError::Denied),
                Some(session) if session.expires_at > now => {
                    return Ok(session.operator.clone());
                }
                Some(_) => {}
            }
        }

        // Expired: evict under the write lock
        if let Some(session) = self.sessions.write().await.remove(token) {
            debug!(username = %session.operator.username, "session expired");
        }
        Err(AccessError::Denied)
    }

    /// Revoke a session; returns whether it existed
    pub async fn logout(&self, token: &str) -> bool {
        match self.sessions.write().await.remove(token) {
            Some(session) => {
                info!(username = %session.operator.username, "operator logged out");
                true
            }
            None => false,
        }
    }

    /// Drop every expired session
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    /// Hash a password into a PHC string for the config file
    ///
    /// # Errors
    /// Returns `AccessError::Hashing` if the hasher fails
    pub fn hash_password(password: &str) -> Result<String, AccessError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AccessError::Hashing(e.to_string()))
    }
}

/// Argon2 is deliberately slow; keep it off the async workers
async fn verify_password(hash: String, password: String) -> Result<bool, AccessError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(|e| AccessError::Hashing(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AccessError::Hashing(e.to_string()))?
}
