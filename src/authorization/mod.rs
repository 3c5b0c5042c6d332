//! Grade-based authorization.
//!
//! A user carries two grades: the real one, which alone decides what the
//! user may do, and an optional visible one, which only changes how the
//! user is displayed. `resolve_user_identity` is the single place the two
//! are combined; every guard works on the resulting `EffectiveIdentity`.
//!
//! Decision order for every predicate:
//! 1. `FullAccess` level → ALLOW, no exceptions
//! 2. `is_admin` flag → ALLOW
//! 3. Level threshold (admin only) or granted permission → ALLOW
//! 4. Default → DENY

pub mod permission;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Grade, UserRecord};

pub use permission::{
    permission_registry, Permission, PermissionInfo, PermissionSet, UnknownPermission,
    PERMISSION_REGISTRY_VERSION,
};

/// Persisted level reserved for unconditional full access.
pub const FULL_ACCESS_LEVEL: i64 = 99;

/// Lowest standard level treated as administrator.
pub const ADMIN_LEVEL: u8 = 10;

// ═══════════════════════════════════════════════════════════
// Authority level
// ═══════════════════════════════════════════════════════════

/// Where a grade sits in the hierarchy.
///
/// `FullAccess` is a distinct variant rather than a large number so it
/// can never lose a numeric comparison. Derived ordering puts it above
/// every `Standard` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum AuthorityLevel {
    Standard(u8),
    FullAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Grade level {0} is outside 0..=99")]
pub struct InvalidLevel(pub i64);

impl AuthorityLevel {
    pub fn is_full_access(self) -> bool {
        matches!(self, Self::FullAccess)
    }

    /// Persisted numeric form.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Standard(level) => i64::from(level),
            Self::FullAccess => FULL_ACCESS_LEVEL,
        }
    }
}

impl TryFrom<i64> for AuthorityLevel {
    type Error = InvalidLevel;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        match level {
            FULL_ACCESS_LEVEL => Ok(Self::FullAccess),
            0..=98 => Ok(Self::Standard(level as u8)),
            _ => Err(InvalidLevel(level)),
        }
    }
}

impl From<AuthorityLevel> for i64 {
    fn from(level: AuthorityLevel) -> Self {
        level.as_i64()
    }
}

impl fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

// ═══════════════════════════════════════════════════════════
// Effective identity
// ═══════════════════════════════════════════════════════════

/// A user as seen by guards: display from the visible grade, authority
/// from the real grade. Only `resolve_user_identity` builds one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveIdentity {
    user_id: i64,
    username: String,
    display_name: Option<String>,
    display_color: Option<String>,
    level: AuthorityLevel,
    permissions: PermissionSet,
    is_admin: bool,
}

impl EffectiveIdentity {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn display_color(&self) -> Option<&str> {
        self.display_color.as_deref()
    }

    /// Always the real grade's level.
    pub fn level(&self) -> AuthorityLevel {
        self.level
    }

    /// Always the real grade's permissions.
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn is_admin_flag(&self) -> bool {
        self.is_admin
    }
}

/// Combine a user with its real and visible grades.
///
/// A user without a real grade resolves to `Standard(0)` with nothing
/// granted. The visible grade never contributes level or permissions.
pub fn resolve_user_identity(
    user: &UserRecord,
    real_grade: Option<&Grade>,
    visible_grade: Option<&Grade>,
) -> EffectiveIdentity {
    let display = visible_grade.or(real_grade);

    EffectiveIdentity {
        user_id: user.id,
        username: user.username.clone(),
        display_name: display.map(|g| g.name.clone()),
        display_color: display.map(|g| g.color.clone()),
        level: real_grade
            .map(|g| g.level)
            .unwrap_or(AuthorityLevel::Standard(0)),
        permissions: real_grade
            .map(|g| g.permissions.clone())
            .unwrap_or_default(),
        is_admin: user.is_admin,
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Access denied: {0}")]
    Forbidden(String),
}

// ═══════════════════════════════════════════════════════════
// Predicates
// ═══════════════════════════════════════════════════════════

/// Entry gate before any other check.
pub fn require_authenticated(
    identity: Option<&EffectiveIdentity>,
) -> Result<&EffectiveIdentity, AuthorizationError> {
    identity.ok_or(AuthorizationError::Unauthenticated)
}

pub fn is_admin(identity: &EffectiveIdentity) -> bool {
    match identity.level {
        AuthorityLevel::FullAccess => true,
        AuthorityLevel::Standard(level) => identity.is_admin || level >= ADMIN_LEVEL,
    }
}

pub fn has_permission(identity: &EffectiveIdentity, permission: Permission) -> bool {
    identity.level.is_full_access() || identity.is_admin || identity.permissions.contains(permission)
}

/// Same as `has_permission` for a raw key, e.g. one read from a request.
pub fn has_permission_key(identity: &EffectiveIdentity, key: &str) -> bool {
    identity.level.is_full_access() || identity.is_admin || identity.permissions.contains_key(key)
}

pub fn has_any_permission(identity: &EffectiveIdentity, permissions: &[Permission]) -> bool {
    permissions.iter().any(|&p| has_permission(identity, p))
}

pub fn has_all_permissions(identity: &EffectiveIdentity, permissions: &[Permission]) -> bool {
    permissions.iter().all(|&p| has_permission(identity, p))
}

pub fn can_access_admin_panel(identity: &EffectiveIdentity) -> bool {
    is_admin(identity) || has_any_permission(identity, Permission::ADMIN_PANEL)
}

/// Admin-panel permissions this identity holds.
pub fn admin_permissions(identity: &EffectiveIdentity) -> Vec<Permission> {
    if is_admin(identity) {
        return Permission::ADMIN_PANEL.to_vec();
    }
    Permission::ADMIN_PANEL
        .iter()
        .copied()
        .filter(|&p| has_permission(identity, p))
        .collect()
}

pub fn require_admin(identity: &EffectiveIdentity) -> Result<(), AuthorizationError> {
    if is_admin(identity) {
        Ok(())
    } else {
        Err(AuthorizationError::Forbidden("administrator required".into()))
    }
}

pub fn require_permission(
    identity: &EffectiveIdentity,
    permission: Permission,
) -> Result<(), AuthorizationError> {
    if has_permission(identity, permission) {
        Ok(())
    } else {
        Err(AuthorizationError::Forbidden(format!(
            "missing permission: {permission}"
        )))
    }
}

// ═══════════════════════════════════════════════════════════
// Hierarchy
// ═══════════════════════════════════════════════════════════

/// Mutation being attempted against a ranked target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyAction {
    CreateGrade,
    EditGrade,
    DeleteGrade,
    AssignGrade,
    EditUser,
    DeleteUser,
}

impl HierarchyAction {
    fn denial(self) -> &'static str {
        match self {
            Self::CreateGrade => "cannot create a grade at or above your own level",
            Self::EditGrade => "cannot manage a grade at or above your own level",
            Self::DeleteGrade => "cannot delete a grade at or above your own level",
            Self::AssignGrade => "cannot assign a grade at or above your own level",
            Self::EditUser => "cannot modify a user at or above your own level",
            Self::DeleteUser => "cannot delete a user at or above your own level",
        }
    }
}

/// Reject `action` when `target` is at or above the actor's level.
///
/// A `FullAccess` actor is exempt in every direction.
pub fn ensure_can_target(
    actor: &EffectiveIdentity,
    target: AuthorityLevel,
    action: HierarchyAction,
) -> Result<(), AuthorizationError> {
    if actor.level.is_full_access() || target < actor.level {
        return Ok(());
    }
    tracing::warn!(
        user_id = actor.user_id,
        actor_level = %actor.level,
        target_level = %target,
        ?action,
        "Hierarchy check denied"
    );
    Err(AuthorizationError::Forbidden(action.denial().into()))
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
