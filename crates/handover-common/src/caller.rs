//! Authenticated caller identity.

use serde::Serialize;
use uuid::Uuid;

/// Who is making a request, resolved from a sign-in token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    /// Listed in the admin allowlist.
    Admin,
    /// A unit owner; may act only on units they are linked to.
    Owner { owner_id: Uuid },
    /// Read-only access to a single property.
    Developer { property_id: Uuid },
}

impl Caller {
    pub fn admin(email: impl Into<String>) -> Self {
        Self { email: email.into(), role: Role::Admin }
    }

    pub fn owner(email: impl Into<String>, owner_id: Uuid) -> Self {
        Self { email: email.into(), role: Role::Owner { owner_id } }
    }

    pub fn developer(email: impl Into<String>, property_id: Uuid) -> Self {
        Self { email: email.into(), role: Role::Developer { property_id } }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    pub fn owner_id(&self) -> Option<Uuid> {
        match self.role {
            Role::Owner { owner_id } => Some(owner_id),
            _ => None,
        }
    }
}
