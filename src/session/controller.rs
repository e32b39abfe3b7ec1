use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::state::{SessionState, SessionStatus};
use crate::auth::{AccessRequest, Operator, Role, User, UserDirectory};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::core::{PlayerId, SessionId};
use crate::errors::{AuthError, ConfigError, SessionError, SettlementError};
use crate::history::{HistoricalSessionRecord, History};
use crate::ledger::{GameConfig, Ledger, Player};
use crate::notify::{Notifier, Severity, TracingNotifier};
use crate::settlement::{self, SettlementResult};
use crate::store::{MemoryStore, Store, StoreKey, load_json, save_json};

/// The final chip counts of the last settlement that went through, and what
/// they produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedSettlement {
    pub final_chips: HashMap<PlayerId, u64>,
    pub result: SettlementResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerRecord {
    config: GameConfig,
    ledger: Ledger,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionRecord {
    state: SessionState,
    accepted: Option<AcceptedSettlement>,
}

/// # SessionControllerBuilder
///
/// Wires the collaborators of a [`SessionController`]. Every field is
/// optional:
///
/// - `store` defaults to an empty [`MemoryStore`]
/// - `notifier` defaults to [`TracingNotifier`]
/// - `clock` defaults to [`SystemClock`]
/// - `config` defaults to [`EngineConfig::default`]
///
/// `build` loads whatever the store already holds, so building against the
/// store of an interrupted process resumes its session.
///
/// ```
/// use poker_settle::auth::{Operator, Permission};
/// use poker_settle::session::SessionControllerBuilder;
///
/// let mut controller = SessionControllerBuilder::new().build().unwrap();
/// let admin = Operator::new("admin@example.com", Permission::Admin);
///
/// controller.start(&admin).unwrap();
/// let alice = controller.add_player(&admin, "Alice").unwrap();
/// controller.add_buyin(&admin, alice).unwrap();
/// assert_eq!(controller.ledger().total_buyins(), 1);
/// ```
#[derive(Default)]
pub struct SessionControllerBuilder {
    store: Option<Box<dyn Store>>,
    notifier: Option<Box<dyn Notifier>>,
    clock: Option<Box<dyn Clock>>,
    config: Option<EngineConfig>,
}

impl SessionControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: Box<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validate the configuration and load every stored record.
    ///
    /// Records that can't be read are logged and replaced with fresh state.
    pub fn build(self) -> Result<SessionController, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let store = self
            .store
            .unwrap_or_else(|| Box::new(MemoryStore::new()));
        let notifier = self.notifier.unwrap_or_else(|| Box::new(TracingNotifier));
        let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock));

        let ledger_record: LedgerRecord = load_or_default(store.as_ref(), StoreKey::Ledger)
            .unwrap_or_else(|| LedgerRecord {
                config: config.game,
                ledger: Ledger::new(),
            });
        let session_record: SessionRecord =
            load_or_default(store.as_ref(), StoreKey::Session).unwrap_or_default();
        let history: History =
            load_or_default(store.as_ref(), StoreKey::History).unwrap_or_default();
        let directory: UserDirectory =
            load_or_default(store.as_ref(), StoreKey::Auth).unwrap_or_default();

        let mut controller = SessionController {
            config,
            game: ledger_record.config,
            ledger: ledger_record.ledger,
            state: session_record.state,
            accepted: session_record.accepted,
            history,
            directory,
            store,
            notifier,
            clock,
            last_saved_at: None,
        };

        if controller.state.is_in_progress() {
            controller.announce_restore();
        }

        Ok(controller)
    }
}

fn load_or_default<T: DeserializeOwned>(store: &dyn Store, key: StoreKey) -> Option<T> {
    match load_json(store, key) {
        Ok(value) => value,
        Err(error) => {
            warn!(%key, ?error, "Unable to load stored record, starting fresh");
            None
        }
    }
}

/// Owns one game: the ledger, the buy-in unit, the session lifecycle, the
/// archive of finished sessions and the user directory.
///
/// Every mutating call takes the [`Operator`] issuing it and is rejected
/// with [`SessionError::Unauthorized`] unless the operator is an admin.
/// State is saved after every successful mutation and, while a session is
/// in progress, whenever [`SessionController::tick`] finds the auto-save
/// interval has passed. Saves are best effort: a failing store is logged
/// and never stops the game.
pub struct SessionController {
    config: EngineConfig,
    game: GameConfig,
    ledger: Ledger,
    state: SessionState,
    accepted: Option<AcceptedSettlement>,
    history: History,
    directory: UserDirectory,
    store: Box<dyn Store>,
    notifier: Box<dyn Notifier>,
    clock: Box<dyn Clock>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl SessionController {
    pub fn builder() -> SessionControllerBuilder {
        SessionControllerBuilder::new()
    }

    /// Resume from `store` with the default notifier, clock and config.
    pub fn restore(store: Box<dyn Store>) -> Result<Self, ConfigError> {
        SessionControllerBuilder::new().store(store).build()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn game_config(&self) -> &GameConfig {
        &self.game
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    /// The settlement that currently authorizes ending the game, if any.
    pub fn last_settlement(&self) -> Option<&AcceptedSettlement> {
        self.accepted.as_ref()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Final chip counts prefilled from what each player has in front of
    /// them, the usual starting point for settling.
    pub fn current_chip_counts(&self) -> HashMap<PlayerId, u64> {
        self.ledger
            .players()
            .iter()
            .map(|p| (p.id, p.current_chips))
            .collect()
    }

    /// Run the calculator without touching any state. Open to anybody.
    pub fn preview_settlement(
        &self,
        final_chips: &HashMap<PlayerId, u64>,
    ) -> Result<SettlementResult, SettlementError> {
        settlement::calculate(self.ledger.players(), &self.game, final_chips)
    }

    #[instrument(level = "debug", skip(self, op), fields(operator = %op.identity))]
    pub fn update_config(&mut self, op: &Operator, game: GameConfig) -> Result<(), SessionError> {
        self.authorize(op)?;
        game.validate()?;
        if game == self.game {
            return Ok(());
        }
        if self.ledger.total_buyins() > 0 {
            warn!(
                old = %self.game,
                new = %game,
                "Buy-in unit changed with buy-ins already recorded, earlier totals keep the old unit"
            );
        }
        self.game = game;
        self.ledger_changed();
        Ok(())
    }

    #[instrument(level = "debug", skip(self, op), fields(operator = %op.identity))]
    pub fn add_player(&mut self, op: &Operator, name: &str) -> Result<PlayerId, SessionError> {
        self.authorize(op)?;
        let id = self.ledger.add_player(name)?;
        self.ledger_changed();
        Ok(id)
    }

    #[instrument(level = "debug", skip(self, op), fields(operator = %op.identity))]
    pub fn remove_player(&mut self, op: &Operator, id: PlayerId) -> Result<Player, SessionError> {
        self.authorize(op)?;
        let removed = self.ledger.remove_player(id)?;
        self.ledger_changed();
        Ok(removed)
    }

    #[instrument(level = "debug", skip(self, op), fields(operator = %op.identity))]
    pub fn add_buyin(&mut self, op: &Operator, id: PlayerId) -> Result<(), SessionError> {
        self.authorize(op)?;
        self.ledger.add_buyin(id, &self.game)?;
        self.ledger_changed();
        Ok(())
    }

    /// Returns `Ok(false)` when the player had no buy-in to remove.
    #[instrument(level = "debug", skip(self, op), fields(operator = %op.identity))]
    pub fn remove_buyin(&mut self, op: &Operator, id: PlayerId) -> Result<bool, SessionError> {
        self.authorize(op)?;
        let changed = self.ledger.remove_buyin(id, &self.game)?;
        if changed {
            self.ledger_changed();
        }
        Ok(changed)
    }

    pub fn set_current_chips(
        &mut self,
        op: &Operator,
        id: PlayerId,
        value: i64,
    ) -> Result<bool, SessionError> {
        self.authorize(op)?;
        let changed = self.ledger.set_current_chips(id, value)?;
        if changed {
            self.ledger_changed();
        }
        Ok(changed)
    }

    /// Raw operator input; anything unparsable counts as zero chips.
    pub fn set_current_chips_str(
        &mut self,
        op: &Operator,
        id: PlayerId,
        input: &str,
    ) -> Result<bool, SessionError> {
        self.authorize(op)?;
        let changed = self.ledger.set_current_chips_str(id, input)?;
        if changed {
            self.ledger_changed();
        }
        Ok(changed)
    }

    #[instrument(level = "info", skip(self, op), fields(operator = %op.identity))]
    pub fn start(&mut self, op: &Operator) -> Result<SessionId, SessionError> {
        self.authorize(op)?;
        let now = self.clock.now();
        let id = self.state.start(now)?;
        self.accepted = None;
        self.persist(&[StoreKey::Session, StoreKey::Ledger]);
        self.notifier
            .notify(&format!("Session {} started", id), Severity::Success);
        Ok(id)
    }

    /// Enter end-game mode.
    pub fn begin_settlement(&mut self, op: &Operator) -> Result<(), SessionError> {
        self.authorize(op)?;
        self.state.begin_settlement()?;
        self.persist(&[StoreKey::Session]);
        Ok(())
    }

    /// Leave end-game mode without settling.
    pub fn cancel_settlement(&mut self, op: &Operator) -> Result<(), SessionError> {
        self.authorize(op)?;
        self.state.cancel_settlement()?;
        self.persist(&[StoreKey::Session]);
        Ok(())
    }

    /// Settle the game with the given final chip counts. On success the
    /// result is kept as the settlement that allows the game to end.
    #[instrument(level = "info", skip(self, op, final_chips), fields(operator = %op.identity))]
    pub fn settle(
        &mut self,
        op: &Operator,
        final_chips: HashMap<PlayerId, u64>,
    ) -> Result<SettlementResult, SessionError> {
        self.authorize(op)?;
        if !self.state.is_in_progress() {
            return Err(SessionError::NotActive);
        }

        let result = settlement::calculate(self.ledger.players(), &self.game, &final_chips)?;
        if !result.is_zero_sum() {
            warn!(
                total_final_chips = result.total_final_chips(),
                total_chips_in_play = result.total_chips_in_play,
                "Final chip counts don't add up to the chips in play"
            );
        }

        self.state.mark_settlement_complete()?;
        self.accepted = Some(AcceptedSettlement {
            final_chips,
            result: result.clone(),
        });
        self.persist(&[StoreKey::Session]);
        self.notifier.notify(
            &format!(
                "Settlement computed: {} payment(s) across {} player(s)",
                result.payments.len(),
                result.players.len()
            ),
            Severity::Info,
        );
        Ok(result)
    }

    /// End the game: archive it, then clear the ledger for the next one.
    #[instrument(level = "info", skip(self, op), fields(operator = %op.identity))]
    pub fn end(&mut self, op: &Operator) -> Result<HistoricalSessionRecord, SessionError> {
        self.authorize(op)?;
        if self.state.is_in_progress()
            && !self.state.settlement_required_before_end
            && self.accepted.is_none()
        {
            // A settled flag without the settlement itself, only possible
            // with a hand edited store.
            return Err(SessionError::SettlementRequired);
        }

        let now = self.clock.now();
        self.state.end(now, &op.identity)?;
        let accepted = self
            .accepted
            .take()
            .ok_or(SessionError::SettlementRequired)?;

        let record = HistoricalSessionRecord {
            session_id: self.state.id.unwrap_or_default(),
            started_at: self.state.started_at.unwrap_or(now),
            completed_at: now,
            completed_by: op.identity.clone(),
            config: self.game,
            players: self.ledger.players().to_vec(),
            settlement: accepted.result,
        };
        self.history.archive(record.clone());
        self.ledger.clear();

        self.persist(&[StoreKey::History, StoreKey::Ledger, StoreKey::Session]);
        self.notifier.notify(
            &format!(
                "Session {} completed by {}",
                record.session_id, record.completed_by
            ),
            Severity::Info,
        );
        Ok(record)
    }

    /// Drop an in-progress session that never had a buy-in. Such a session
    /// has no chips in play and so can never be settled or ended.
    pub fn abandon(&mut self, op: &Operator) -> Result<(), SessionError> {
        self.authorize(op)?;
        if !self.state.is_in_progress() {
            return Err(SessionError::NotActive);
        }
        if self.ledger.total_buyins() > 0 {
            return Err(SessionError::NotAbandonable);
        }
        self.state.abandon()?;
        self.accepted = None;
        self.persist(&[StoreKey::Session]);
        self.notifier
            .notify("Session abandoned without buy-ins", Severity::Warning);
        Ok(())
    }

    /// Periodic auto-save. Saves the ledger and session when a session is in
    /// progress and the auto-save interval has passed since the last save.
    /// Returns whether a save happened.
    pub fn tick(&mut self) -> bool {
        if !self.state.is_in_progress() {
            return false;
        }
        let now = self.clock.now();
        let due = match self.last_saved_at {
            Some(last) => now - last >= self.config.autosave_interval(),
            None => true,
        };
        if due {
            debug!("Auto-saving session");
            self.persist(&[StoreKey::Ledger, StoreKey::Session]);
        }
        due
    }

    /// Save every record now.
    pub fn save_all(&mut self) {
        self.persist(&StoreKey::ALL);
    }

    pub fn bootstrap_super_admin(&mut self, email: &str) -> Result<User, AuthError> {
        let now = self.clock.now();
        let user = self.directory.bootstrap(email, now)?.clone();
        self.persist(&[StoreKey::Auth]);
        Ok(user)
    }

    pub fn invite_user(&mut self, op: &Operator, email: &str, role: Role) -> Result<User, AuthError> {
        let now = self.clock.now();
        let user = self.directory.invite(op, email, role, now)?.clone();
        self.persist(&[StoreKey::Auth]);
        Ok(user)
    }

    pub fn request_access(&mut self, email: &str, message: &str) -> Result<Uuid, AuthError> {
        let now = self.clock.now();
        let id = self.directory.request_access(email, message, now)?;
        self.persist(&[StoreKey::Auth]);
        Ok(id)
    }

    pub fn approve_access(&mut self, op: &Operator, request_id: Uuid) -> Result<User, AuthError> {
        let now = self.clock.now();
        let user = self.directory.approve(op, request_id, now)?.clone();
        self.persist(&[StoreKey::Auth]);
        Ok(user)
    }

    pub fn reject_access(
        &mut self,
        op: &Operator,
        request_id: Uuid,
    ) -> Result<AccessRequest, AuthError> {
        let request = self.directory.reject(op, request_id)?;
        self.persist(&[StoreKey::Auth]);
        Ok(request)
    }

    pub fn remove_user(&mut self, op: &Operator, user_id: Uuid) -> Result<User, AuthError> {
        let user = self.directory.remove_user(op, user_id)?;
        self.persist(&[StoreKey::Auth]);
        Ok(user)
    }

    fn authorize(&self, op: &Operator) -> Result<(), SessionError> {
        if op.can_edit() {
            return Ok(());
        }
        warn!(
            operator = %op.identity,
            permission = %op.permission,
            "Rejected change from operator without edit rights"
        );
        Err(SessionError::Unauthorized {
            identity: op.identity.clone(),
            permission: op.permission,
        })
    }

    /// Bookkeeping after any change to the ledger or buy-in unit: a
    /// completed settlement no longer matches, so it stops counting.
    fn ledger_changed(&mut self) {
        if self.state.rearm() {
            info!("Ledger changed after settlement, settlement required again");
            self.accepted = None;
        }
        self.persist(&[StoreKey::Ledger, StoreKey::Session]);
    }

    fn announce_restore(&mut self) {
        let now = self.clock.now();
        let minutes = self
            .state
            .started_at
            .map(|s| (now - s).num_minutes())
            .unwrap_or(0);
        let id = self
            .state
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        info!(%id, minutes, "Restored session in progress");
        self.notifier.notify(
            &format!("Session {} resumed ({} min active)", id, minutes),
            Severity::Warning,
        );
    }

    fn persist(&mut self, keys: &[StoreKey]) {
        for key in keys {
            let result = match key {
                StoreKey::Ledger => {
                    let record = LedgerRecord {
                        config: self.game,
                        ledger: self.ledger.clone(),
                    };
                    save_json(self.store.as_mut(), *key, &record)
                }
                StoreKey::Session => {
                    let record = SessionRecord {
                        state: self.state.clone(),
                        accepted: self.accepted.clone(),
                    };
                    save_json(self.store.as_mut(), *key, &record)
                }
                StoreKey::History => save_json(self.store.as_mut(), *key, &self.history),
                StoreKey::Auth => save_json(self.store.as_mut(), *key, &self.directory),
            };
            if let Err(error) = result {
                warn!(%key, ?error, "Unable to save record");
            }
        }
        self.last_saved_at = Some(self.clock.now());
    }
}
