use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::SessionId;
use crate::errors::SessionError;

/// Where a session is in its life.
///
/// ```text
/// Inactive -> Active -> SettlementPending <-> SettlementComplete -> Ended
/// ```
///
/// `Active`, `SettlementPending` and `SettlementComplete` all count as a
/// session in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Inactive,
    Active,
    SettlementPending,
    SettlementComplete,
    Ended,
}

impl SessionStatus {
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            SessionStatus::Active
                | SessionStatus::SettlementPending
                | SessionStatus::SettlementComplete
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Inactive => write!(f, "Inactive"),
            SessionStatus::Active => write!(f, "Active"),
            SessionStatus::SettlementPending => write!(f, "Settlement Pending"),
            SessionStatus::SettlementComplete => write!(f, "Settlement Complete"),
            SessionStatus::Ended => write!(f, "Ended"),
        }
    }
}

/// The session lifecycle on its own, with no ledger and no I/O.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: Option<SessionId>,
    pub started_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    /// Set while a fresh settlement is needed before the game may end
    pub settlement_required_before_end: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_progress(&self) -> bool {
        self.status.is_in_progress()
    }

    /// Open a new session. Allowed when nothing is in progress.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<SessionId, SessionError> {
        if self.is_in_progress() {
            return Err(SessionError::AlreadyActive);
        }
        let id = SessionId::new();
        *self = SessionState {
            id: Some(id),
            started_at: Some(now),
            status: SessionStatus::Active,
            settlement_required_before_end: true,
            completed_at: None,
            completed_by: None,
        };
        info!(%id, "Session started");
        Ok(id)
    }

    /// Enter end-game mode, where final chip counts are being collected.
    pub fn begin_settlement(&mut self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Active => {
                self.status = SessionStatus::SettlementPending;
                Ok(())
            }
            SessionStatus::SettlementPending | SessionStatus::SettlementComplete => Ok(()),
            _ => Err(SessionError::NotActive),
        }
    }

    /// Leave end-game mode without settling. A completed settlement stays
    /// valid.
    pub fn cancel_settlement(&mut self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::SettlementPending => {
                self.status = SessionStatus::Active;
                Ok(())
            }
            SessionStatus::Active | SessionStatus::SettlementComplete => Ok(()),
            _ => Err(SessionError::NotActive),
        }
    }

    /// Record that a settlement ran cleanly against the current ledger.
    pub fn mark_settlement_complete(&mut self) -> Result<(), SessionError> {
        if !self.is_in_progress() {
            return Err(SessionError::NotActive);
        }
        self.status = SessionStatus::SettlementComplete;
        self.settlement_required_before_end = false;
        Ok(())
    }

    /// The ledger changed. Any completed settlement is stale, so another one
    /// is needed before the game can end. Returns whether anything changed.
    pub fn rearm(&mut self) -> bool {
        if !self.is_in_progress() || self.settlement_required_before_end {
            return false;
        }
        self.settlement_required_before_end = true;
        if self.status == SessionStatus::SettlementComplete {
            self.status = SessionStatus::SettlementPending;
        }
        true
    }

    /// Close the session. Needs a session in progress with a settlement
    /// that is still current.
    pub fn end(&mut self, now: DateTime<Utc>, by: &str) -> Result<(), SessionError> {
        if self.settlement_required_before_end {
            return Err(SessionError::SettlementRequired);
        }
        if !self.is_in_progress() {
            return Err(SessionError::NotActive);
        }
        self.status = SessionStatus::Ended;
        self.completed_at = Some(now);
        self.completed_by = Some(by.to_string());
        info!(id = ?self.id, by, "Session ended");
        Ok(())
    }

    /// Drop an in-progress session without archiving it.
    pub fn abandon(&mut self) -> Result<(), SessionError> {
        if !self.is_in_progress() {
            return Err(SessionError::NotActive);
        }
        info!(id = ?self.id, "Session abandoned");
        *self = SessionState::default();
        Ok(())
    }
}
