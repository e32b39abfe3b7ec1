use thiserror::Error;

use crate::auth::Permission;
use crate::core::PlayerId;

#[derive(Error, Debug, PartialEq, Eq, Clone, Hash)]
pub enum LedgerError {
    #[error("Player {0} not found")]
    NotFound(PlayerId),

    #[error("A player named {0:?} already exists")]
    DuplicateName(String),

    #[error("Player name can't be blank")]
    EmptyName,

    #[error("Buy-in totals for player {0} are too large to track")]
    BuyinOverflow(PlayerId),
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum SettlementError {
    #[error("No final chip count supplied for player {player}")]
    IncompleteSettlementInput { player: PlayerId },

    #[error("No chips in play, nothing to settle")]
    NoChipsInPlay,

    #[error("Totals in play are too large to settle")]
    Overflow,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Error reading configuration caused by IO error")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

// Only InvalidConfiguration can come out of a session operation and it is
// the one worth comparing in tests.
impl PartialEq for ConfigError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidConfiguration(a), Self::InvalidConfiguration(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("{identity} ({permission}) is not allowed to change the game")]
    Unauthorized {
        identity: String,
        permission: Permission,
    },

    #[error("A session is already active")]
    AlreadyActive,

    #[error("No session is active")]
    NotActive,

    #[error("Settlement must be completed before the game can end")]
    SettlementRequired,

    #[error("Only a session without buy-ins can be abandoned")]
    NotAbandonable,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store IO error")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode stored record: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Hash)]
pub enum AuthError {
    #[error("{identity} is not allowed to do that")]
    Unauthorized { identity: String },

    #[error("Invalid email address {0:?}")]
    InvalidEmail(String),

    #[error("User {0} already exists")]
    UserExists(String),

    #[error("No approved user {0}")]
    UnknownUser(String),

    #[error("An access request for {0} is already pending")]
    RequestPending(String),

    #[error("Access request not found")]
    RequestNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("The super admin can't be removed")]
    CannotRemoveSuperAdmin,

    #[error("The user directory is already initialized")]
    AlreadyInitialized,

    #[error("Login code expired or never issued")]
    CodeExpired,

    #[error("Login code doesn't match")]
    CodeMismatch,

    #[error("{identity} can't grant the {role} role")]
    RoleNotGrantable { identity: String, role: String },
}
