//! # Ledger
//!
//! Per-player buy-in and chip bookkeeping for one game. The ledger knows
//! nothing about sessions or permissions; the
//! [`SessionController`](crate::session::SessionController) gates access and
//! decides when a mutation invalidates a settlement.
//!
//! Every mutating call reports whether anything actually changed so callers
//! can skip persistence and settlement re-arming on no-ops.
//!
//! ```
//! use poker_settle::ledger::{GameConfig, Ledger};
//!
//! let config = GameConfig::default();
//! let mut ledger = Ledger::new();
//! let alice = ledger.add_player("Alice").unwrap();
//! ledger.add_buyin(alice, &config).unwrap();
//! ledger.add_buyin(alice, &config).unwrap();
//!
//! let player = ledger.player(alice).unwrap();
//! assert_eq!(player.buyin_count, 2);
//! assert_eq!(player.total_chips_issued, 200);
//! assert_eq!(player.total_spent.to_string(), "$40.00");
//! ```
mod config;

pub use config::GameConfig;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::{Cents, PlayerId};
use crate::errors::LedgerError;

/// One seat at the table and everything bought so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub buyin_count: u32,
    pub total_chips_issued: u64,
    pub total_spent: Cents,
    /// Chips in front of the player right now. Edited freely by an admin and
    /// only loosely tied to `total_chips_issued`.
    pub current_chips: u64,
}

impl Player {
    fn new(name: String) -> Self {
        Self {
            id: PlayerId::new(),
            name,
            buyin_count: 0,
            total_chips_issued: 0,
            total_spent: Cents::ZERO,
            current_chips: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    players: Vec<Player>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Players in the order they were added.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Player> {
        let name = name.trim().to_lowercase();
        self.players.iter().find(|p| p.name.to_lowercase() == name)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn total_buyins(&self) -> u64 {
        self.players.iter().map(|p| p.buyin_count as u64).sum()
    }

    /// Add a player with every counter at zero.
    ///
    /// Names are trimmed and must be unique ignoring case.
    #[instrument(level = "debug", skip(self))]
    pub fn add_player(&mut self, name: &str) -> Result<PlayerId, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::EmptyName);
        }
        if self.find_by_name(name).is_some() {
            return Err(LedgerError::DuplicateName(name.to_string()));
        }

        let player = Player::new(name.to_string());
        let id = player.id;
        self.players.push(player);
        debug!(%id, num_players = self.players.len(), "Player added");
        Ok(id)
    }

    /// Remove a player outright. Their buy-ins leave every future total.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Player, LedgerError> {
        let idx = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(LedgerError::NotFound(id))?;
        let removed = self.players.remove(idx);
        debug!(
            %id,
            buyins = removed.buyin_count,
            "Player removed"
        );
        Ok(removed)
    }

    /// Record one more buy-in. Fails with [`LedgerError::BuyinOverflow`]
    /// instead of wrapping when a total no longer fits, leaving the player
    /// untouched.
    pub fn add_buyin(&mut self, id: PlayerId, config: &GameConfig) -> Result<(), LedgerError> {
        let player = self.player_mut(id)?;
        let overflow = || LedgerError::BuyinOverflow(id);
        let buyin_count = player.buyin_count.checked_add(1).ok_or_else(overflow)?;
        let total_chips_issued = player
            .total_chips_issued
            .checked_add(config.chips_per_buyin)
            .ok_or_else(overflow)?;
        let total_spent = player
            .total_spent
            .checked_add(config.dollars_per_buyin)
            .ok_or_else(overflow)?;
        let current_chips = player
            .current_chips
            .checked_add(config.chips_per_buyin)
            .ok_or_else(overflow)?;

        player.buyin_count = buyin_count;
        player.total_chips_issued = total_chips_issued;
        player.total_spent = total_spent;
        player.current_chips = current_chips;
        debug!(%id, buyins = player.buyin_count, "Buy-in added");
        Ok(())
    }

    /// Undo one buy-in. Returns `Ok(false)` when the player has none left.
    ///
    /// `current_chips` is floored at zero, so it can drift from
    /// `total_chips_issued` if an admin already lowered it by hand.
    pub fn remove_buyin(&mut self, id: PlayerId, config: &GameConfig) -> Result<bool, LedgerError> {
        let player = self.player_mut(id)?;
        if player.buyin_count == 0 {
            return Ok(false);
        }
        player.buyin_count -= 1;
        player.total_chips_issued = player
            .total_chips_issued
            .saturating_sub(config.chips_per_buyin);
        player.total_spent -= config.dollars_per_buyin;
        player.current_chips = player.current_chips.saturating_sub(config.chips_per_buyin);
        debug!(%id, buyins = player.buyin_count, "Buy-in removed");
        Ok(true)
    }

    /// Set the chips currently in front of a player, clamping negatives to
    /// zero. Returns whether the count changed.
    pub fn set_current_chips(&mut self, id: PlayerId, value: i64) -> Result<bool, LedgerError> {
        let player = self.player_mut(id)?;
        let value = value.max(0) as u64;
        if player.current_chips == value {
            return Ok(false);
        }
        player.current_chips = value;
        debug!(%id, current_chips = value, "Current chips updated");
        Ok(true)
    }

    /// Same as [`Ledger::set_current_chips`] for raw operator input.
    ///
    /// Only the leading integer counts, so `"150 chips"` is 150 and `"12.5"`
    /// is 12. Input without a leading integer counts as zero.
    pub fn set_current_chips_str(&mut self, id: PlayerId, input: &str) -> Result<bool, LedgerError> {
        self.set_current_chips(id, leading_integer(input))
    }

    /// Drop every player, ready for the next game.
    pub fn clear(&mut self) {
        self.players.clear();
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, LedgerError> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(LedgerError::NotFound(id))
    }
}

/// The optionally signed run of digits at the start of `input`, after
/// leading whitespace. Too many digits saturate.
fn leading_integer(input: &str) -> i64 {
    let input = input.trim_start();
    let (negative, rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return 0;
    }

    let magnitude = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
    if negative { -magnitude } else { magnitude }
}
