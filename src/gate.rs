//! Role and ownership authorization checks.
//!
//! The gate answers exactly one question per call: may this principal do
//! this thing. It holds no state and emits nothing; callers turn its
//! errors into responses and audit records. Ownership resolution is a
//! collaborator behind [`OwnerDirectory`] so the gate itself never touches
//! storage.

use std::collections::HashMap;

use crate::principal::{Principal, Role, RoleSet};

/// Errors raised by authorization checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// The route needs an authenticated administrator and none was present.
    #[error("administrator authentication required")]
    AdminRequired,
    /// An administrator is present but their role does not grant this
    /// route.
    #[error("current role does not grant access (requires one of: {allowed})")]
    InsufficientRole {
        /// The role the administrator holds, if any.
        role: Option<Role>,
        /// The roles the route accepts.
        allowed: RoleSet,
    },
    /// The principal neither owns the resource nor holds admin standing.
    #[error("principal does not own resource {resource}")]
    NotOwner {
        /// Identifier of the resource that was guarded.
        resource: String,
    },
}

/// Resolves which principal owns a resource.
///
/// The single seam between authorization and storage. Production wires
/// this to the data layer; tests and demos use [`StaticOwners`].
pub trait OwnerDirectory: Send + Sync {
    /// The owning principal id for `resource_id`, or `None` when the
    /// resource is unknown or ownerless.
    fn owner_of(&self, resource_id: &str) -> Option<String>;
}

/// Fixed in-memory ownership table.
///
/// # Examples
///
/// ```
/// use guard_core::{OwnerDirectory, StaticOwners};
///
/// let owners = StaticOwners::new().with_owner("poll-9", "voter-12");
/// assert_eq!(owners.owner_of("poll-9"), Some("voter-12".to_string()));
/// assert_eq!(owners.owner_of("poll-404"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticOwners {
    owners: HashMap<String, String>,
}

impl StaticOwners {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one resource-to-owner mapping.
    pub fn with_owner(mut self, resource_id: impl Into<String>, owner: impl Into<String>) -> Self {
        self.owners.insert(resource_id.into(), owner.into());
        self
    }
}

impl OwnerDirectory for StaticOwners {
    fn owner_of(&self, resource_id: &str) -> Option<String> {
        self.owners.get(resource_id).cloned()
    }
}

/// Stateless role and ownership gate.
///
/// Both checks take the principal as an `Option` so unauthenticated
/// requests flow through the same code path and come out with the right
/// error class: missing admin authentication reads as a credential
/// problem, while a failed ownership check is an authorization denial
/// even for anonymous callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    /// Creates the gate.
    pub fn new() -> Self {
        Self
    }

    /// Requires an authenticated administrator holding one of `allowed`.
    ///
    /// # Errors
    ///
    /// - [`AccessError::AdminRequired`] when no admin principal is present,
    ///   including the case of an authenticated non-admin
    /// - [`AccessError::InsufficientRole`] when an admin is present but
    ///   their role (or lack of one) is outside `allowed`
    pub fn require_role(
        &self,
        principal: Option<&Principal>,
        allowed: &RoleSet,
    ) -> Result<(), AccessError> {
        let principal = match principal {
            Some(p) if p.is_admin() => p,
            _ => return Err(AccessError::AdminRequired),
        };

        match principal.role() {
            Some(role) if allowed.contains(role) => Ok(()),
            role => Err(AccessError::InsufficientRole {
                role,
                allowed: allowed.clone(),
            }),
        }
    }

    /// Requires that the principal owns `resource_id`, with administrators
    /// passing unconditionally.
    ///
    /// `owner` is the already-resolved owning principal id, typically from
    /// an [`OwnerDirectory`]. An unknown resource (`owner == None`) fails
    /// for every non-admin, as does an anonymous caller.
    ///
    /// # Errors
    ///
    /// [`AccessError::NotOwner`] carrying the resource id.
    pub fn require_ownership(
        &self,
        principal: Option<&Principal>,
        resource_id: &str,
        owner: Option<&str>,
    ) -> Result<(), AccessError> {
        match principal {
            Some(p) if p.is_admin() => Ok(()),
            Some(p) if owner == Some(p.id()) => Ok(()),
            _ => Err(AccessError::NotOwner {
                resource: resource_id.to_string(),
            }),
        }
    }
}
