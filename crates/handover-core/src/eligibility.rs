//! Co-owner consistency and booking eligibility.
//!
//! Co-owners of a unit share one payment state and one documents state.
//! When their rows disagree the unit is treated as being in the
//! least-advanced state any owner holds.

use handover_common::{DocumentsStatus, HandoverStatus, IneligibleReason, PaymentStatus};
use handover_db::UnitOwner;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    NoOwners,
    Consistent { payment: PaymentStatus, documents: DocumentsStatus },
    Diverged { payment: PaymentStatus, documents: DocumentsStatus },
}

impl SyncState {
    pub fn of(owners: &[UnitOwner]) -> Self {
        let Some((payment, documents)) = least_advanced(owners) else {
            return SyncState::NoOwners;
        };
        let agree = owners
            .iter()
            .all(|o| o.payment_status == payment && o.documents_status == documents);
        if agree {
            SyncState::Consistent { payment, documents }
        } else {
            SyncState::Diverged { payment, documents }
        }
    }

    /// The effective shared state (least advanced when diverged).
    pub fn effective(&self) -> Option<(PaymentStatus, DocumentsStatus)> {
        match *self {
            SyncState::NoOwners => None,
            SyncState::Consistent { payment, documents }
            | SyncState::Diverged { payment, documents } => Some((payment, documents)),
        }
    }

    pub fn is_diverged(&self) -> bool {
        matches!(self, SyncState::Diverged { .. })
    }
}

/// Least-advanced payment and documents state across the owners.
pub fn least_advanced(owners: &[UnitOwner]) -> Option<(PaymentStatus, DocumentsStatus)> {
    let payment = owners.iter().map(|o| o.payment_status).min_by_key(|p| p.rank())?;
    let documents = owners.iter().map(|o| o.documents_status).min_by_key(|d| d.rank())?;
    Some((payment, documents))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub reasons: Vec<IneligibleReason>,
}

impl Eligibility {
    fn from_reasons(reasons: Vec<IneligibleReason>) -> Self {
        Self { eligible: reasons.is_empty(), reasons }
    }
}

/// Whether a unit may be booked now.
pub fn evaluate(owners: &[UnitOwner], has_active_booking: bool, status: HandoverStatus) -> Eligibility {
    let mut reasons = Vec::new();

    match SyncState::of(owners) {
        SyncState::NoOwners => reasons.push(IneligibleReason::NoOwners),
        sync => {
            if owners.iter().any(|o| o.payment_status != PaymentStatus::Cleared) {
                reasons.push(IneligibleReason::PaymentNotCleared);
            }
            if owners.iter().any(|o| o.documents_status != DocumentsStatus::Approved) {
                reasons.push(IneligibleReason::DocumentsNotApproved);
            }
            if sync.is_diverged() {
                reasons.push(IneligibleReason::CoOwnersDiverged);
            }
        }
    }
    if has_active_booking {
        reasons.push(IneligibleReason::AlreadyBooked);
    }
    if status == HandoverStatus::Completed {
        reasons.push(IneligibleReason::HandoverCompleted);
    }

    Eligibility::from_reasons(reasons)
}

/// Handover status implied by the unit's current facts.
pub fn derive_status(
    current: HandoverStatus,
    owners: &[UnitOwner],
    has_active_booking: bool,
) -> HandoverStatus {
    if current == HandoverStatus::Completed {
        return HandoverStatus::Completed;
    }
    if has_active_booking {
        return HandoverStatus::Booked;
    }
    if evaluate(owners, false, current).eligible {
        HandoverStatus::Ready
    } else {
        HandoverStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn owner(payment: PaymentStatus, documents: DocumentsStatus) -> UnitOwner {
        UnitOwner {
            unit_id: Uuid::nil(),
            owner_id: Uuid::new_v4(),
            name: "Owner".to_string(),
            email: "owner@example.com".to_string(),
            phone: None,
            is_primary: false,
            payment_status: payment,
            documents_status: documents,
            linked_at: Utc::now(),
        }
    }

    fn ready() -> UnitOwner {
        owner(PaymentStatus::Cleared, DocumentsStatus::Approved)
    }

    #[test]
    fn test_no_owners() {
        let e = evaluate(&[], false, HandoverStatus::Pending);
        assert_eq!(e.reasons, vec![IneligibleReason::NoOwners]);
        assert!(!e.eligible);
        assert_eq!(SyncState::of(&[]), SyncState::NoOwners);
    }

    #[test]
    fn test_cleared_and_approved_is_eligible() {
        let e = evaluate(&[ready(), ready()], false, HandoverStatus::Ready);
        assert!(e.eligible);
        assert!(e.reasons.is_empty());
    }

    #[test]
    fn test_reasons_accumulate() {
        let owners = vec![owner(PaymentStatus::Partial, DocumentsStatus::Submitted)];
        let e = evaluate(&owners, true, HandoverStatus::Completed);
        assert_eq!(
            e.reasons,
            vec![
                IneligibleReason::PaymentNotCleared,
                IneligibleReason::DocumentsNotApproved,
                IneligibleReason::AlreadyBooked,
                IneligibleReason::HandoverCompleted,
            ]
        );
    }

    #[test]
    fn test_one_lagging_coowner_blocks_booking() {
        let owners = vec![ready(), owner(PaymentStatus::Pending, DocumentsStatus::Approved)];
        let e = evaluate(&owners, false, HandoverStatus::Pending);
        assert_eq!(
            e.reasons,
            vec![IneligibleReason::PaymentNotCleared, IneligibleReason::CoOwnersDiverged]
        );
    }

    #[test]
    fn test_least_advanced_uses_rank() {
        let owners = vec![
            owner(PaymentStatus::Cleared, DocumentsStatus::Missing),
            owner(PaymentStatus::Partial, DocumentsStatus::Rejected),
            owner(PaymentStatus::Cleared, DocumentsStatus::Approved),
        ];
        assert_eq!(
            least_advanced(&owners),
            Some((PaymentStatus::Partial, DocumentsStatus::Rejected))
        );
        assert_eq!(
            SyncState::of(&owners),
            SyncState::Diverged { payment: PaymentStatus::Partial, documents: DocumentsStatus::Rejected }
        );
    }

    #[test]
    fn test_derive_status() {
        assert_eq!(derive_status(HandoverStatus::Pending, &[ready()], false), HandoverStatus::Ready);
        assert_eq!(derive_status(HandoverStatus::Ready, &[ready()], true), HandoverStatus::Booked);
        assert_eq!(derive_status(HandoverStatus::Booked, &[], false), HandoverStatus::Pending);
        assert_eq!(
            derive_status(HandoverStatus::Completed, &[ready()], false),
            HandoverStatus::Completed
        );
    }
}
