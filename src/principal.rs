use std::fmt;

use serde::{Deserialize, Serialize};

/// An authenticated identity reconstructed from a verified credential.
///
/// Principals are ephemeral: they are decoded from a bearer credential on
/// every request and never persisted by this crate. The one structural
/// invariant is that a role is only ever attached to an admin principal;
/// user principals carry no role.
///
/// # Examples
///
/// ```
/// use guard_core::{Principal, PrincipalKind, Role};
///
/// let voter = Principal::user("voter-381");
/// assert_eq!(voter.kind(), PrincipalKind::User);
/// assert!(voter.role().is_none());
///
/// let staff = Principal::admin("staff-7", Role::Manager);
/// assert!(staff.is_admin());
/// assert_eq!(staff.role(), Some(Role::Manager));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrincipalParts")]
pub struct Principal {
    id: String,
    kind: PrincipalKind,
    role: Option<Role>,
}

impl Principal {
    /// Creates a user principal (no role).
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: PrincipalKind::User,
            role: None,
        }
    }

    /// Creates an admin principal holding the given role.
    pub fn admin(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            kind: PrincipalKind::Admin,
            role: Some(role),
        }
    }

    /// Assembles a principal from already-decoded parts, enforcing the
    /// role invariant.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPrincipal`] when a role is supplied for a user-kind
    /// principal. Admin principals without a role are representable; they
    /// simply fail every role check downstream.
    pub fn from_parts(
        id: impl Into<String>,
        kind: PrincipalKind,
        role: Option<Role>,
    ) -> Result<Self, InvalidPrincipal> {
        if kind == PrincipalKind::User && role.is_some() {
            return Err(InvalidPrincipal { kind, role });
        }
        Ok(Self {
            id: id.into(),
            kind,
            role,
        })
    }

    /// Returns the principal's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the principal kind.
    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// Returns the held role, if any.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// True when this is an admin-kind principal.
    pub fn is_admin(&self) -> bool {
        self.kind == PrincipalKind::Admin
    }
}

/// Wire shape of a principal. Deserialization funnels through
/// [`Principal::from_parts`] so serde input cannot bypass the role
/// invariant.
#[derive(Deserialize)]
struct PrincipalParts {
    id: String,
    kind: PrincipalKind,
    role: Option<Role>,
}

impl TryFrom<PrincipalParts> for Principal {
    type Error = InvalidPrincipal;

    fn try_from(parts: PrincipalParts) -> Result<Self, Self::Error> {
        Principal::from_parts(parts.id, parts.kind, parts.role)
    }
}

/// Error returned when principal parts violate the role invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a {kind} principal cannot hold the {role:?} role")]
pub struct InvalidPrincipal {
    /// The kind the caller supplied.
    pub kind: PrincipalKind,
    /// The role the caller supplied.
    pub role: Option<Role>,
}

/// The two principal kinds this pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// An end user (e.g. a registered voter).
    User,
    /// Back-office staff; the only kind that may carry a [`Role`].
    Admin,
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::User => write!(f, "user"),
            PrincipalKind::Admin => write!(f, "admin"),
        }
    }
}

/// Roles an admin principal may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Day-to-day management access.
    Manager,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Manager => write!(f, "manager"),
        }
    }
}

/// A small allowed-role set used by role gates.
///
/// Construction deduplicates, so membership and display are stable however
/// the set was built.
///
/// # Examples
///
/// ```
/// use guard_core::{Role, RoleSet};
///
/// let allowed = RoleSet::new(&[Role::Admin, Role::Manager, Role::Admin]);
/// assert!(allowed.contains(Role::Manager));
/// assert_eq!(allowed.to_string(), "admin, manager");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet {
    roles: Vec<Role>,
}

impl RoleSet {
    /// Builds a set from a slice, dropping duplicates.
    pub fn new(roles: &[Role]) -> Self {
        let mut deduped = Vec::with_capacity(roles.len());
        for role in roles {
            if !deduped.contains(role) {
                deduped.push(*role);
            }
        }
        Self { roles: deduped }
    }

    /// The set containing only [`Role::Admin`].
    pub fn admin_only() -> Self {
        Self::new(&[Role::Admin])
    }

    /// The set containing every defined role.
    pub fn any_admin() -> Self {
        Self::new(&[Role::Admin, Role::Manager])
    }

    /// Membership test.
    pub fn contains(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Iterates the member roles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }

    /// True when the set has no members.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl From<Role> for RoleSet {
    fn from(role: Role) -> Self {
        Self::new(&[role])
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, role) in self.roles.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", role)?;
        }
        Ok(())
    }
}
