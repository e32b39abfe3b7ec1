//! The session lifecycle and the controller that runs a game.
//!
//! [`SessionState`] is the bare state machine. [`SessionController`] owns a
//! whole game (ledger, buy-in unit, settlement, history and users), checks
//! who is asking, and saves after every change. [`AutoSaver`] adds the
//! periodic save while a session is in progress.
mod autosave;
mod controller;
mod state;

pub use autosave::AutoSaver;
pub use controller::{AcceptedSettlement, SessionController, SessionControllerBuilder};
pub use state::{SessionState, SessionStatus};
