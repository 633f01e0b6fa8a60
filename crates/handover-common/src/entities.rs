//! Status enums shared by the store, the services and the API.
//! Each one is persisted as lowercase snake_case TEXT.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Implements `as_str`, `Display` and `FromStr` over the stored spelling.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Serialize to the string stored in the DB.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Unit handover lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum HandoverStatus {
    Pending,
    Ready,
    Booked,
    Completed,
}

text_enum!(HandoverStatus {
    Pending => "pending",
    Ready => "ready",
    Booked => "booked",
    Completed => "completed",
});

// ---------------------------------------------------------------------------
// Co-owner state (kept identical across all owners of a unit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Cleared,
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Partial => "partial",
    Cleared => "cleared",
});

impl PaymentStatus {
    /// Position in the payment lifecycle; lower is less advanced.
    pub fn rank(&self) -> u8 {
        match self {
            PaymentStatus::Pending => 0,
            PaymentStatus::Partial => 1,
            PaymentStatus::Cleared => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DocumentsStatus {
    Missing,
    Submitted,
    Approved,
    Rejected,
}

text_enum!(DocumentsStatus {
    Missing => "missing",
    Submitted => "submitted",
    Approved => "approved",
    Rejected => "rejected",
});

impl DocumentsStatus {
    /// Position in the review lifecycle. A rejection sits below `missing`
    /// because it needs an owner action before anything else can happen.
    pub fn rank(&self) -> u8 {
        match self {
            DocumentsStatus::Rejected => 0,
            DocumentsStatus::Missing => 1,
            DocumentsStatus::Submitted => 2,
            DocumentsStatus::Approved => 3,
        }
    }

    /// Whether an owner upload should move the unit back into review.
    pub fn awaits_upload(&self) -> bool {
        matches!(self, DocumentsStatus::Missing | DocumentsStatus::Rejected)
    }
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Completed,
    Cancelled,
}

text_enum!(BookingStatus {
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl BookingStatus {
    /// Only confirmed bookings hold a slot.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Confirmed)
    }
}

/// Why a unit cannot be booked right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    NoOwners,
    PaymentNotCleared,
    DocumentsNotApproved,
    CoOwnersDiverged,
    AlreadyBooked,
    HandoverCompleted,
}

text_enum!(IneligibleReason {
    NoOwners => "no_owners",
    PaymentNotCleared => "payment_not_cleared",
    DocumentsNotApproved => "documents_not_approved",
    CoOwnersDiverged => "co_owners_diverged",
    AlreadyBooked => "already_booked",
    HandoverCompleted => "handover_completed",
});

// ---------------------------------------------------------------------------
// Timeline, reviews, email
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RemarkKind {
    Note,
    Booking,
    Payment,
    Documents,
    Finance,
    Ownership,
}

text_enum!(RemarkKind {
    Note => "note",
    Booking => "booking",
    Payment => "payment",
    Documents => "documents",
    Finance => "finance",
    Ownership => "ownership",
});

/// Review state of uploaded documents and proofs of payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(ReviewStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EmailStatus {
    Sent,
    Failed,
}

text_enum!(EmailStatus {
    Sent => "sent",
    Failed => "failed",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Cleared".parse::<PaymentStatus>().unwrap(), PaymentStatus::Cleared);
        assert_eq!(" approved ".parse::<DocumentsStatus>().unwrap(), DocumentsStatus::Approved);
        assert!("paid".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_stored_spelling_matches_serde() {
        for status in BookingStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_rejected_documents_rank_lowest() {
        let lowest = DocumentsStatus::ALL.iter().min_by_key(|d| d.rank()).unwrap();
        assert_eq!(*lowest, DocumentsStatus::Rejected);
        assert!(DocumentsStatus::Rejected.awaits_upload());
        assert!(!DocumentsStatus::Submitted.awaits_upload());
    }

    #[test]
    fn test_only_confirmed_bookings_are_active() {
        assert!(BookingStatus::Confirmed.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
        assert!(!BookingStatus::Completed.is_active());
    }
}
