//! Role ordering and membership authorization rules.
//!
//! Roles are ordered by privilege: `Owner` outranks `Admin`, which outranks
//! `Member`. The numeric rank (0, 1, 2) is what the database and API payloads
//! carry; a lower rank means more privilege.

use super::types::AuthContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    /// Numeric rank stored in `team_roles.role`; lower means more privilege.
    #[must_use]
    pub const fn rank(self) -> i32 {
        match self {
            Self::Owner => 0,
            Self::Admin => 1,
            Self::Member => 2,
        }
    }

    #[must_use]
    pub const fn from_rank(rank: i32) -> Option<Self> {
        match rank {
            0 => Some(Self::Owner),
            1 => Some(Self::Admin),
            2 => Some(Self::Member),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

/// Allow the caller through when their role is at least as privileged as
/// `threshold`. A missing role always denies.
pub(crate) fn require_role(context: &AuthContext, threshold: Role) -> Option<Role> {
    match context.role() {
        Some(role) if role <= threshold => Some(role),
        _ => None,
    }
}

/// Removal rules for team members:
///
/// - a user with no role row is always removable
/// - an `Owner` can only be removed by themself
/// - an `Admin` can be removed by an `Owner`, or remove themself
/// - a `Member` can be removed by anyone who passed the `Admin` gate
///
/// The same conditions are encoded in the removal SQL filter, so a role that
/// changes concurrently still results in zero affected rows.
pub(crate) fn member_removal_allowed(
    caller_id: &str,
    caller_role: Role,
    target_id: &str,
    target_role: Option<Role>,
) -> bool {
    match target_role {
        None | Some(Role::Member) => true,
        Some(Role::Owner) => caller_id == target_id,
        Some(Role::Admin) => caller_role == Role::Owner || caller_id == target_id,
    }
}
