//! # Session history
//!
//! An append-only archive of finished sessions. A record is written once,
//! when its session ends, and is never changed or removed afterwards.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::SessionId;
use crate::ledger::{GameConfig, Player};
use crate::settlement::SettlementResult;

/// Everything worth keeping about a finished session. A deep copy of the
/// ledger at the time it ended, never a view of the live one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSessionRecord {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Identity of the operator that ended the session
    pub completed_by: String,
    pub config: GameConfig,
    pub players: Vec<Player>,
    pub settlement: SettlementResult,
}

impl HistoricalSessionRecord {
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

/// Archived sessions, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    records: Vec<HistoricalSessionRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Always succeeds, even for a session id seen before.
    pub fn archive(&mut self, record: HistoricalSessionRecord) {
        debug!(
            session_id = %record.session_id,
            num_players = record.players.len(),
            "Archiving session"
        );
        self.records.insert(0, record);
    }

    /// Newest first.
    pub fn list(&self) -> &[HistoricalSessionRecord] {
        &self.records
    }

    pub fn latest(&self) -> Option<&HistoricalSessionRecord> {
        self.records.first()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
