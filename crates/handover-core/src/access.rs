//! Who may see and change what.
//!
//! Admins are recognised by email against a static allowlist. Owners act on
//! the units they are linked to. Developers get read-only access to the
//! units of one property.

use handover_common::{Caller, HandoverError, Result, Role};
use handover_db::{Unit, UnitOwner};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Admin email allowlist (trimmed, case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct AdminAllowlist {
    emails: HashSet<String>,
}

impl AdminAllowlist {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| normalize_email(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.emails.contains(&normalize_email(email))
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shape check only: `local@domain.tld` without whitespace.
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

pub fn require_admin(caller: &Caller) -> Result<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(HandoverError::forbidden("admin access required"))
    }
}

fn is_linked(caller_owner: uuid::Uuid, owners: &[UnitOwner]) -> bool {
    owners.iter().any(|o| o.owner_id == caller_owner)
}

pub fn can_view_unit(caller: &Caller, unit: &Unit, owners: &[UnitOwner]) -> bool {
    match caller.role {
        Role::Admin => true,
        Role::Owner { owner_id } => is_linked(owner_id, owners),
        Role::Developer { property_id } => unit.property_id == property_id,
    }
}

pub fn can_manage_unit(caller: &Caller, owners: &[UnitOwner]) -> bool {
    match caller.role {
        Role::Admin => true,
        Role::Owner { owner_id } => is_linked(owner_id, owners),
        Role::Developer { .. } => false,
    }
}

pub fn ensure_view_unit(caller: &Caller, unit: &Unit, owners: &[UnitOwner]) -> Result<()> {
    if can_view_unit(caller, unit, owners) {
        Ok(())
    } else {
        Err(HandoverError::forbidden(format!("no access to unit {}", unit.unit_number)))
    }
}

pub fn ensure_manage_unit(caller: &Caller, unit: &Unit, owners: &[UnitOwner]) -> Result<()> {
    if can_manage_unit(caller, owners) {
        Ok(())
    } else {
        Err(HandoverError::forbidden(format!("cannot modify unit {}", unit.unit_number)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use handover_common::{DocumentsStatus, PaymentStatus};
    use uuid::Uuid;

    fn link(unit: &Unit, owner_id: Uuid) -> UnitOwner {
        UnitOwner {
            unit_id: unit.id,
            owner_id,
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            phone: None,
            is_primary: true,
            payment_status: PaymentStatus::Pending,
            documents_status: DocumentsStatus::Missing,
            linked_at: Utc::now(),
        }
    }

    #[test]
    fn test_allowlist_is_case_insensitive() {
        let admins = AdminAllowlist::new(["Admin@Example.com ", ""]);
        assert_eq!(admins.len(), 1);
        assert!(admins.is_admin("admin@example.com"));
        assert!(admins.is_admin("  ADMIN@example.COM"));
        assert!(!admins.is_admin("owner@example.com"));
    }

    #[test]
    fn test_unit_visibility_by_role() {
        let property_id = Uuid::new_v4();
        let unit = Unit::new(property_id, "A-1".to_string());
        let owner_id = Uuid::new_v4();
        let owners = vec![link(&unit, owner_id)];

        let admin = Caller::admin("admin@example.com");
        let owner = Caller::owner("sam@example.com", owner_id);
        let stranger = Caller::owner("eve@example.com", Uuid::new_v4());
        let developer = Caller::developer("dev@example.com", property_id);
        let other_dev = Caller::developer("dev@example.com", Uuid::new_v4());

        assert!(can_view_unit(&admin, &unit, &owners));
        assert!(can_view_unit(&owner, &unit, &owners));
        assert!(!can_view_unit(&stranger, &unit, &owners));
        assert!(can_view_unit(&developer, &unit, &owners));
        assert!(!can_view_unit(&other_dev, &unit, &owners));

        assert!(can_manage_unit(&admin, &owners));
        assert!(can_manage_unit(&owner, &owners));
        assert!(!can_manage_unit(&stranger, &owners));
        assert!(!can_manage_unit(&developer, &owners));
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("sam@example.com"));
        assert!(is_valid_email("dev@azure.example"));
        assert!(!is_valid_email("sam"));
        assert!(!is_valid_email("sam@localhost"));
        assert!(!is_valid_email("sam smith@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&Caller::admin("a@example.com")).is_ok());
        let err = require_admin(&Caller::owner("o@example.com", Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, HandoverError::Forbidden(_)));
    }
}
