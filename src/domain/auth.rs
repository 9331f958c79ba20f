use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Manager,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Manager => "manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "manager" => Ok(Role::Manager),
            other => Err(DomainError::Internal(format!("unknown role '{other}'"))),
        }
    }
}

/// The authenticated caller, as carried by a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    /// Whether the caller may read a resource owned by `owner_id`.
    pub fn can_access_owned_by(&self, owner_id: Uuid) -> bool {
        self.is_manager() || self.user_id == owner_id
    }
}

/// The set of roles allowed to invoke an operation.
///
/// Handlers evaluate one of these before doing any work; an empty set is not
/// meaningful and is never constructed.
#[derive(Debug, Clone, Copy)]
pub struct RoleRequirement(&'static [Role]);

impl RoleRequirement {
    pub const CLIENT: RoleRequirement = RoleRequirement(&[Role::Client]);
    pub const MANAGER: RoleRequirement = RoleRequirement(&[Role::Manager]);
    pub const ANY: RoleRequirement = RoleRequirement(&[Role::Client, Role::Manager]);

    pub fn allows(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn check(&self, principal: &Principal) -> Result<(), DomainError> {
        if self.allows(principal.role) {
            Ok(())
        } else {
            Err(DomainError::forbidden())
        }
    }
}
