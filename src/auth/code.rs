use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Operator, Permission, Role, UserDirectory};
use crate::errors::AuthError;

/// Delivers a login code to its owner. Email, SMS, a console for local
/// play; the issuer doesn't care.
pub trait CodeChannel: Send {
    fn deliver(&mut self, email: &str, code: &str);
}

/// A channel that keeps every delivered code in memory.
///
/// Clones share the same outbox, so a test or a local front end can hold one
/// clone and give the other to the [`CodeIssuer`].
#[derive(Debug, Clone, Default)]
pub struct OutboxChannel {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl OutboxChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last code sent to `email`, if any.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CodeChannel for OutboxChannel {
    fn deliver(&mut self, email: &str, code: &str) {
        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.push((email.to_string(), code.to_string()));
    }
}

/// Proof of a successful login, good until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSession {
    pub identity: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl LoginSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The operator this login speaks for, as the directory sees the user
    /// right now. Expired logins and users removed since logging in carry
    /// no permission; a changed role applies at once.
    pub fn operator(&self, directory: &UserDirectory, now: DateTime<Utc>) -> Operator {
        if self.is_expired(now) {
            return Operator::new(self.identity.clone(), Permission::None);
        }
        directory.operator_for(&self.identity)
    }
}

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    expires_at: DateTime<Utc>,
}

/// Issues and checks six digit one-time login codes.
///
/// Codes live only in memory and are never logged or persisted.
pub struct CodeIssuer {
    channel: Box<dyn CodeChannel>,
    code_ttl: Duration,
    login_ttl: Duration,
    pending: HashMap<String, PendingCode>,
}

impl CodeIssuer {
    pub fn new(channel: Box<dyn CodeChannel>, code_ttl: Duration, login_ttl: Duration) -> Self {
        Self {
            channel,
            code_ttl,
            login_ttl,
            pending: HashMap::new(),
        }
    }

    /// Send a fresh code to a known user, replacing any earlier one.
    /// Returns when the code stops working.
    pub fn issue(
        &mut self,
        directory: &UserDirectory,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, AuthError> {
        let user = directory
            .user(email)
            .ok_or_else(|| AuthError::UnknownUser(email.trim().to_lowercase()))?;

        let code = format!("{:06}", rand::rng().random_range(100_000..1_000_000u32));
        let expires_at = now + self.code_ttl;
        self.channel.deliver(&user.email, &code);
        self.pending
            .insert(user.email.clone(), PendingCode { code, expires_at });

        debug!(email = %user.email, %expires_at, "Login code issued");
        Ok(expires_at)
    }

    /// Trade a code for a login. A correct code is single use; a wrong code
    /// leaves the pending one in place.
    pub fn verify(
        &mut self,
        directory: &UserDirectory,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginSession, AuthError> {
        let email = email.trim().to_lowercase();
        let Some(pending) = self.pending.get(&email).cloned() else {
            return Err(AuthError::CodeExpired);
        };
        if pending.expires_at <= now {
            self.pending.remove(&email);
            return Err(AuthError::CodeExpired);
        }

        if pending.code != code.trim() {
            warn!(%email, "Wrong login code");
            return Err(AuthError::CodeMismatch);
        }
        self.pending.remove(&email);

        let user = directory
            .user(&email)
            .ok_or_else(|| AuthError::UnknownUser(email.clone()))?;

        info!(%email, role = %user.role, "Logged in");
        Ok(LoginSession {
            identity: user.email.clone(),
            role: user.role,
            expires_at: now + self.login_ttl,
        })
    }
}
