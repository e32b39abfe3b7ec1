use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Operator, Permission, Role};
use crate::errors::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    /// Who added the user, `system` for the bootstrap super admin
    pub added_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: Uuid,
    pub email: String,
    pub message: String,
    pub requested_at: DateTime<Utc>,
}

/// Approved users and pending access requests.
///
/// Emails are trimmed and lowercased before any comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDirectory {
    users: Vec<User>,
    access_requests: Vec<AccessRequest>,
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail(email))
    }
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn access_requests(&self) -> &[AccessRequest] {
        &self.access_requests
    }

    pub fn is_initialized(&self) -> bool {
        !self.users.is_empty()
    }

    pub fn user(&self, email: &str) -> Option<&User> {
        let email = email.trim().to_lowercase();
        self.users.iter().find(|u| u.email == email)
    }

    /// The operator for a known email, or an operator without permissions.
    pub fn operator_for(&self, email: &str) -> Operator {
        match self.user(email) {
            Some(user) => Operator::new(user.email.clone(), user.role.into()),
            None => Operator::new(email.trim().to_lowercase(), Permission::None),
        }
    }

    /// Create the first user, a super admin. Only allowed on an empty
    /// directory.
    pub fn bootstrap(&mut self, email: &str, now: DateTime<Utc>) -> Result<&User, AuthError> {
        if self.is_initialized() {
            return Err(AuthError::AlreadyInitialized);
        }
        let email = normalize_email(email)?;
        info!(%email, "Super admin created");
        Ok(self.push_user(email, Role::SuperAdmin, Some("system".to_string()), now))
    }

    /// Add a user directly. Admins may add viewers; super admins may add
    /// viewers and admins. Nobody can create another super admin.
    pub fn invite(
        &mut self,
        op: &Operator,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<&User, AuthError> {
        require_admin(op)?;
        let grantable = match op.permission {
            Permission::SuperAdmin => matches!(role, Role::Viewer | Role::Admin),
            _ => role == Role::Viewer,
        };
        if !grantable {
            return Err(AuthError::RoleNotGrantable {
                identity: op.identity.clone(),
                role: role.to_string(),
            });
        }

        let email = normalize_email(email)?;
        if self.user(&email).is_some() {
            return Err(AuthError::UserExists(email));
        }
        self.access_requests.retain(|r| r.email != email);
        info!(%email, %role, by = %op.identity, "User invited");
        Ok(self.push_user(email, role, Some(op.identity.clone()), now))
    }

    /// File a request for viewer access. One pending request per email.
    pub fn request_access(
        &mut self,
        email: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AuthError> {
        let email = normalize_email(email)?;
        if self.user(&email).is_some() {
            return Err(AuthError::UserExists(email));
        }
        if self.access_requests.iter().any(|r| r.email == email) {
            return Err(AuthError::RequestPending(email));
        }

        let id = Uuid::now_v7();
        debug!(%email, %id, "Access requested");
        self.access_requests.push(AccessRequest {
            id,
            email,
            message: message.trim().to_string(),
            requested_at: now,
        });
        Ok(id)
    }

    /// Grant a pending request as a viewer.
    pub fn approve(
        &mut self,
        op: &Operator,
        request_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<&User, AuthError> {
        require_admin(op)?;
        let request = self.take_request(request_id)?;
        info!(email = %request.email, by = %op.identity, "Access approved");
        Ok(self.push_user(request.email, Role::Viewer, Some(op.identity.clone()), now))
    }

    pub fn reject(&mut self, op: &Operator, request_id: Uuid) -> Result<AccessRequest, AuthError> {
        require_admin(op)?;
        let request = self.take_request(request_id)?;
        info!(email = %request.email, by = %op.identity, "Access rejected");
        Ok(request)
    }

    /// Remove a user. The super admin stays; admins may only remove viewers.
    pub fn remove_user(&mut self, op: &Operator, user_id: Uuid) -> Result<User, AuthError> {
        require_admin(op)?;
        let idx = self
            .users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or(AuthError::UserNotFound)?;

        match (op.permission, self.users[idx].role) {
            (_, Role::SuperAdmin) => return Err(AuthError::CannotRemoveSuperAdmin),
            (Permission::SuperAdmin, _) | (_, Role::Viewer) => {}
            _ => {
                return Err(AuthError::Unauthorized {
                    identity: op.identity.clone(),
                });
            }
        }

        let user = self.users.remove(idx);
        info!(email = %user.email, by = %op.identity, "User removed");
        Ok(user)
    }

    fn take_request(&mut self, request_id: Uuid) -> Result<AccessRequest, AuthError> {
        let idx = self
            .access_requests
            .iter()
            .position(|r| r.id == request_id)
            .ok_or(AuthError::RequestNotFound)?;
        Ok(self.access_requests.remove(idx))
    }

    fn push_user(
        &mut self,
        email: String,
        role: Role,
        added_by: Option<String>,
        now: DateTime<Utc>,
    ) -> &User {
        self.users.push(User {
            id: Uuid::now_v7(),
            email,
            role,
            created_at: now,
            added_by,
        });
        &self.users[self.users.len() - 1]
    }
}

fn require_admin(op: &Operator) -> Result<(), AuthError> {
    if op.can_edit() {
        Ok(())
    } else {
        Err(AuthError::Unauthorized {
            identity: op.identity.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn directory() -> (UserDirectory, Operator) {
        let mut dir = UserDirectory::new();
        dir.bootstrap("Boss@Example.com", now()).unwrap();
        let boss = dir.operator_for("boss@example.com");
        (dir, boss)
    }

    #[test]
    fn test_bootstrap_once() {
        let (mut dir, boss) = directory();
        assert_eq!(boss.permission, Permission::SuperAdmin);
        assert_eq!(boss.identity, "boss@example.com");
        assert_eq!(
            dir.bootstrap("other@example.com", now()),
            Err(AuthError::AlreadyInitialized)
        );
    }

    #[test]
    fn test_bootstrap_needs_valid_email() {
        let mut dir = UserDirectory::new();
        assert!(matches!(
            dir.bootstrap("not-an-email", now()),
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            dir.bootstrap("a@b", now()),
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(!dir.is_initialized());
    }

    #[test]
    fn test_invite_role_limits() {
        let (mut dir, boss) = directory();
        dir.invite(&boss, "admin@example.com", Role::Admin, now())
            .unwrap();
        let admin = dir.operator_for("admin@example.com");
        assert_eq!(admin.permission, Permission::Admin);

        assert!(matches!(
            dir.invite(&admin, "second@example.com", Role::Admin, now()),
            Err(AuthError::RoleNotGrantable { .. })
        ));
        assert!(matches!(
            dir.invite(&boss, "second@example.com", Role::SuperAdmin, now()),
            Err(AuthError::RoleNotGrantable { .. })
        ));

        let viewer = dir
            .invite(&admin, "viewer@example.com", Role::Viewer, now())
            .unwrap()
            .clone();
        assert_eq!(viewer.added_by.as_deref(), Some("admin@example.com"));

        let viewer_op = dir.operator_for("viewer@example.com");
        assert!(matches!(
            dir.invite(&viewer_op, "x@example.com", Role::Viewer, now()),
            Err(AuthError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_invite_duplicate() {
        let (mut dir, boss) = directory();
        dir.invite(&boss, "v@example.com", Role::Viewer, now())
            .unwrap();
        assert_eq!(
            dir.invite(&boss, "V@example.com", Role::Viewer, now()),
            Err(AuthError::UserExists("v@example.com".to_string()))
        );
    }

    #[test]
    fn test_access_request_flow() {
        let (mut dir, boss) = directory();
        let id = dir
            .request_access("guest@example.com", "  let me in ", now())
            .unwrap();
        assert_eq!(dir.access_requests()[0].message, "let me in");
        assert_eq!(
            dir.request_access("guest@example.com", "again", now()),
            Err(AuthError::RequestPending("guest@example.com".to_string()))
        );

        let user = dir.approve(&boss, id, now()).unwrap();
        assert_eq!(user.role, Role::Viewer);
        assert!(dir.access_requests().is_empty());
        assert_eq!(
            dir.approve(&boss, id, now()),
            Err(AuthError::RequestNotFound)
        );
    }

    #[test]
    fn test_reject_request() {
        let (mut dir, boss) = directory();
        let id = dir.request_access("guest@example.com", "", now()).unwrap();
        let anonymous = Operator::anonymous();
        assert!(dir.reject(&anonymous, id).is_err());
        let rejected = dir.reject(&boss, id).unwrap();
        assert_eq!(rejected.email, "guest@example.com");
        assert!(dir.user("guest@example.com").is_none());
    }

    #[test]
    fn test_remove_user_rules() {
        let (mut dir, boss) = directory();
        let boss_id = dir.user("boss@example.com").unwrap().id;
        let admin_id = dir
            .invite(&boss, "admin@example.com", Role::Admin, now())
            .unwrap()
            .id;
        let other_admin_id = dir
            .invite(&boss, "admin2@example.com", Role::Admin, now())
            .unwrap()
            .id;
        let viewer_id = dir
            .invite(&boss, "viewer@example.com", Role::Viewer, now())
            .unwrap()
            .id;
        let admin = dir.operator_for("admin@example.com");

        assert_eq!(
            dir.remove_user(&boss, boss_id),
            Err(AuthError::CannotRemoveSuperAdmin)
        );
        assert!(matches!(
            dir.remove_user(&admin, other_admin_id),
            Err(AuthError::Unauthorized { .. })
        ));
        assert!(dir.remove_user(&admin, viewer_id).is_ok());
        assert!(dir.remove_user(&boss, admin_id).is_ok());
        assert_eq!(
            dir.remove_user(&boss, admin_id),
            Err(AuthError::UserNotFound)
        );
    }

    #[test]
    fn test_unknown_email_has_no_permission() {
        let (dir, _) = directory();
        assert_eq!(
            dir.operator_for("stranger@example.com").permission,
            Permission::None
        );
    }
}
