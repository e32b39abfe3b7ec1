//! # Access control
//!
//! Who may change the game. The session engine only needs an [`Operator`],
//! an identity plus a [`Permission`] level, on every mutating call. The rest
//! of this module is the small user directory and one-time login code flow
//! that produce that operator:
//!
//! - [`UserDirectory`] keeps approved users and pending access requests.
//! - [`CodeIssuer`] hands out short-lived login codes through a pluggable
//!   [`CodeChannel`] and trades a correct code for a [`LoginSession`].
mod code;
mod directory;

pub use code::{CodeChannel, CodeIssuer, LoginSession, OutboxChannel};
pub use directory::{AccessRequest, User, UserDirectory};

use std::fmt;

use serde::{Deserialize, Serialize};

/// The role stored for a user in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Admin,
    SuperAdmin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Viewer => write!(f, "viewer"),
            Role::Admin => write!(f, "admin"),
            Role::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

/// What the current operator is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    #[default]
    None,
    Viewer,
    Admin,
    SuperAdmin,
}

impl Permission {
    /// Admins and super admins may change the game.
    pub fn can_edit(self) -> bool {
        matches!(self, Permission::Admin | Permission::SuperAdmin)
    }
}

impl From<Role> for Permission {
    fn from(role: Role) -> Self {
        match role {
            Role::Viewer => Permission::Viewer,
            Role::Admin => Permission::Admin,
            Role::SuperAdmin => Permission::SuperAdmin,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::None => write!(f, "none"),
            Permission::Viewer => write!(f, "viewer"),
            Permission::Admin => write!(f, "admin"),
            Permission::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

/// The person issuing a command, as vouched for by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operator {
    pub identity: String,
    pub permission: Permission,
}

impl Operator {
    pub fn new(identity: impl Into<String>, permission: Permission) -> Self {
        Self {
            identity: identity.into(),
            permission,
        }
    }

    /// Nobody is logged in.
    pub fn anonymous() -> Self {
        Self::new("anonymous", Permission::None)
    }

    pub fn can_edit(&self) -> bool {
        self.permission.can_edit()
    }
}
