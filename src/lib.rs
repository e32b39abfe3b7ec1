//! # poker_settle
//!
//! Bookkeeping for home poker games: who bought in and how often, what the
//! chips are worth at the end, and who pays whom to square up.
//!
//! - [`ledger`] tracks players, buy-ins and current chip counts against a
//!   configurable buy-in unit.
//! - [`settlement`] turns final chip counts into per player profit and a
//!   list of payments.
//! - [`session`] runs the game lifecycle, requires a current settlement
//!   before a game can end, and archives finished games into [`history`].
//! - [`auth`] decides who may change the game. Everybody may look.
//! - [`store`] persists everything as JSON records.
//!
//! ```
//! use std::collections::HashMap;
//!
//! use poker_settle::auth::{Operator, Permission};
//! use poker_settle::session::SessionController;
//!
//! let admin = Operator::new("host@example.com", Permission::Admin);
//! let mut game = SessionController::builder().build().unwrap();
//!
//! game.start(&admin).unwrap();
//! let alice = game.add_player(&admin, "Alice").unwrap();
//! let bob = game.add_player(&admin, "Bob").unwrap();
//! game.add_buyin(&admin, alice).unwrap();
//! game.add_buyin(&admin, alice).unwrap();
//! game.add_buyin(&admin, bob).unwrap();
//!
//! let result = game
//!     .settle(&admin, HashMap::from([(alice, 250), (bob, 50)]))
//!     .unwrap();
//! assert_eq!(result.payments[0].to_string(), "Bob pays Alice $10.00");
//!
//! let record = game.end(&admin).unwrap();
//! assert_eq!(record.players.len(), 2);
//! assert!(game.ledger().is_empty());
//! ```
pub mod auth;
pub mod clock;
pub mod config;
pub mod core;
pub mod errors;
pub mod history;
pub mod ledger;
pub mod notify;
pub mod session;
pub mod settlement;
pub mod store;
