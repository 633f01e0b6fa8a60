//! Store-level rules that the partial unique indexes and link transactions
//! are responsible for.

use chrono::{NaiveDate, NaiveTime, Utc};
use handover_common::{
    BookingStatus, DocumentsStatus, HandoverStatus, PaymentStatus, RemarkKind, ReviewStatus,
};
use handover_db::{
    tokens, Attachment, Booking, BookingFilter, BookingRepository, Database, DbError,
    EmailLogRepository, FinancePenalty, FinanceRepository, MagicLink, MagicLinkRepository,
    NewLink, Owner, OwnerRepository, Property, PropertyRepository, Remark, RemarkRepository, Unit,
    UnitRepository, AttachmentRepository,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use uuid::Uuid;

struct Fixture {
    db: Arc<Database>,
    property: Property,
    units: UnitRepository,
    owners: OwnerRepository,
    bookings: BookingRepository,
}

async fn fixture() -> Fixture {
    let db = Database::open_in_memory().await.unwrap();
    db.initialize().await.unwrap();
    let db = Arc::new(db);

    let property = Property::new("Marina Heights".to_string(), "Acme Developments".to_string());
    PropertyRepository::new(db.clone()).insert(&property).await.unwrap();

    Fixture {
        units: UnitRepository::new(db.clone()),
        owners: OwnerRepository::new(db.clone()),
        bookings: BookingRepository::new(db.clone()),
        db,
        property,
    }
}

impl Fixture {
    async fn unit(&self, number: &str) -> Unit {
        let unit = Unit::new(self.property.id, number.to_string());
        self.units.insert(&unit).await.unwrap();
        unit
    }

    async fn owner(&self, email: &str) -> Owner {
        let owner = Owner::new(email.split('@').next().unwrap().to_string(), email);
        self.owners.insert(&owner).await.unwrap();
        owner
    }

    async fn link(&self, unit: &Unit, owner: &Owner, is_primary: bool) {
        self.units
            .link_owner(&NewLink {
                unit_id: unit.id,
                owner_id: owner.id,
                is_primary,
                payment_status: PaymentStatus::Pending,
                documents_status: DocumentsStatus::Missing,
            })
            .await
            .unwrap();
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 3, 4).unwrap()
}

fn at(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
}

#[tokio::test]
async fn test_two_units_cannot_hold_the_same_slot() {
    let f = fixture().await;
    let a = f.unit("A-101").await;
    let b = f.unit("A-102").await;
    let owner = f.owner("sam@example.com").await;

    f.bookings.insert(&Booking::new(&a, owner.id, day(), at(10))).await.unwrap();
    let err = f
        .bookings
        .insert(&Booking::new(&b, owner.id, day(), at(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Duplicate(_)), "got {err:?}");

    // a different slot on the same day is fine
    f.bookings.insert(&Booking::new(&b, owner.id, day(), at(11))).await.unwrap();
    assert_eq!(f.bookings.taken_slots(f.property.id, day()).await.unwrap(), vec![at(10), at(11)]);
}

#[tokio::test]
async fn test_unit_holds_at_most_one_active_booking() {
    let f = fixture().await;
    let unit = f.unit("B-201").await;
    let owner = f.owner("kim@example.com").await;

    f.bookings.insert(&Booking::new(&unit, owner.id, day(), at(9))).await.unwrap();
    let err = f
        .bookings
        .insert(&Booking::new(&unit, owner.id, day(), at(14)))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Duplicate(_)));
}

#[tokio::test]
async fn test_confirmed_booking_writes_remark_and_status_together() {
    let f = fixture().await;
    let remarks = RemarkRepository::new(f.db.clone());
    let a = f.unit("A-501").await;
    let b = f.unit("A-502").await;
    let owner = f.owner("sam@example.com").await;

    let booking = Booking::new(&a, owner.id, day(), at(9));
    let remark = Remark::new(a.id, "admin@example.com", RemarkKind::Booking, "Booked".to_string());
    f.bookings.insert_confirmed(&booking, &remark).await.unwrap();
    assert_eq!(remarks.list_for_unit(a.id).await.unwrap().len(), 1);
    let stored = f.units.find_by_id(a.id).await.unwrap().unwrap();
    assert_eq!(stored.handover_status, HandoverStatus::Booked);

    // the slot is taken, so neither the remark nor the status of B may change
    let clash = Booking::new(&b, owner.id, day(), at(9));
    let remark = Remark::new(b.id, "admin@example.com", RemarkKind::Booking, "Booked".to_string());
    let err = f.bookings.insert_confirmed(&clash, &remark).await.unwrap_err();
    assert!(matches!(err, DbError::Duplicate(_)), "got {err:?}");
    assert!(remarks.list_for_unit(b.id).await.unwrap().is_empty());
    let stored = f.units.find_by_id(b.id).await.unwrap().unwrap();
    assert_eq!(stored.handover_status, HandoverStatus::Pending);
}

#[tokio::test]
async fn test_cancelled_booking_frees_slot_and_unit() {
    let f = fixture().await;
    let unit = f.unit("C-301").await;
    let other = f.unit("C-302").await;
    let owner = f.owner("lee@example.com").await;

    let first = Booking::new(&unit, owner.id, day(), at(13));
    f.bookings.insert(&first).await.unwrap();
    assert!(f.bookings.set_status(first.id, BookingStatus::Cancelled, None).await.unwrap());

    assert!(f.bookings.active_for_unit(unit.id).await.unwrap().is_none());
    assert!(f.bookings.slot_holder(f.property.id, day(), at(13)).await.unwrap().is_none());

    // both the slot and the unit can be booked again
    f.bookings.insert(&Booking::new(&other, owner.id, day(), at(13))).await.unwrap();
    f.bookings.insert(&Booking::new(&unit, owner.id, day(), at(15))).await.unwrap();

    let confirmed = f
        .bookings
        .list(&BookingFilter { status: Some(BookingStatus::Confirmed), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 2);
}

#[tokio::test]
async fn test_booking_filter_by_owner() {
    let f = fixture().await;
    let mine = f.unit("D-1").await;
    let theirs = f.unit("D-2").await;
    let me = f.owner("me@example.com").await;
    let them = f.owner("them@example.com").await;
    f.link(&mine, &me, true).await;
    f.link(&theirs, &them, true).await;

    f.bookings.insert(&Booking::new(&mine, me.id, day(), at(9))).await.unwrap();
    f.bookings.insert(&Booking::new(&theirs, them.id, day(), at(10))).await.unwrap();

    let filter = BookingFilter { owner_id: Some(me.id), ..Default::default() };
    let visible = f.bookings.list(&filter).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].unit_id, mine.id);
}

#[tokio::test]
async fn test_new_primary_demotes_previous() {
    let f = fixture().await;
    let unit = f.unit("E-1").await;
    let first = f.owner("first@example.com").await;
    let second = f.owner("second@example.com").await;

    f.link(&unit, &first, true).await;
    f.link(&unit, &second, true).await;

    let owners = f.units.owners(unit.id).await.unwrap();
    assert_eq!(owners.len(), 2);
    assert_eq!(owners[0].owner_id, second.id);
    assert!(owners[0].is_primary);
    assert!(!owners[1].is_primary);
}

#[tokio::test]
async fn test_unlinking_primary_promotes_earliest_coowner() {
    let f = fixture().await;
    let unit = f.unit("F-1").await;
    let primary = f.owner("p@example.com").await;
    let early = f.owner("early@example.com").await;
    let late = f.owner("late@example.com").await;
    f.link(&unit, &primary, true).await;
    f.link(&unit, &early, false).await;
    f.link(&unit, &late, false).await;

    let promoted = f.units.unlink_owner(unit.id, primary.id).await.unwrap();
    assert_eq!(promoted, Some(early.id));

    let link = f.units.owner_link(unit.id, early.id).await.unwrap().unwrap();
    assert!(link.is_primary);

    // removing a non-primary promotes nobody
    assert_eq!(f.units.unlink_owner(unit.id, late.id).await.unwrap(), None);

    let missing = f.units.unlink_owner(unit.id, late.id).await.unwrap_err();
    assert!(matches!(missing, DbError::NotFound(_)));
}

#[tokio::test]
async fn test_linking_same_owner_twice_is_duplicate() {
    let f = fixture().await;
    let unit = f.unit("G-1").await;
    let owner = f.owner("twice@example.com").await;
    f.link(&unit, &owner, true).await;

    let err = f
        .units
        .link_owner(&NewLink {
            unit_id: unit.id,
            owner_id: owner.id,
            is_primary: false,
            payment_status: PaymentStatus::Pending,
            documents_status: DocumentsStatus::Missing,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Duplicate(_)));
}

#[tokio::test]
async fn test_status_writes_reach_every_coowner() {
    let f = fixture().await;
    let unit = f.unit("H-1").await;
    let a = f.owner("a@example.com").await;
    let b = f.owner("b@example.com").await;
    f.link(&unit, &a, true).await;
    f.link(&unit, &b, false).await;

    assert_eq!(f.units.set_payment_status(unit.id, PaymentStatus::Cleared).await.unwrap(), 2);
    assert_eq!(f.units.set_documents_status(unit.id, DocumentsStatus::Approved).await.unwrap(), 2);

    for link in f.units.owners(unit.id).await.unwrap() {
        assert_eq!(link.payment_status, PaymentStatus::Cleared);
        assert_eq!(link.documents_status, DocumentsStatus::Approved);
    }
}

#[tokio::test]
async fn test_duplicate_unit_number_and_owner_email() {
    let f = fixture().await;
    f.unit("I-1").await;
    let err = f.units.insert(&Unit::new(f.property.id, "I-1".to_string())).await.unwrap_err();
    assert!(matches!(err, DbError::Duplicate(_)));

    f.owner("dup@example.com").await;
    let err = f.owners.insert(&Owner::new("Dup".to_string(), " DUP@example.com ")).await.unwrap_err();
    assert!(matches!(err, DbError::Duplicate(_)));
    assert!(f.owners.find_by_email("Dup@Example.com").await.unwrap().is_some());
}

#[tokio::test]
async fn test_penalty_totals_skip_waived() {
    let f = fixture().await;
    let unit = f.unit("J-1").await;
    let finance = FinanceRepository::new(f.db.clone());

    let late = FinancePenalty {
        id: Uuid::new_v4(),
        unit_id: unit.id,
        amount_cents: 50_000,
        reason: "late payment".to_string(),
        waived: false,
        created_at: Utc::now(),
    };
    let admin_fee = FinancePenalty { id: Uuid::new_v4(), amount_cents: 12_500, ..late.clone() };
    finance.insert_penalty(&late).await.unwrap();
    finance.insert_penalty(&admin_fee).await.unwrap();
    assert_eq!(finance.outstanding_penalties(unit.id).await.unwrap(), 62_500);

    assert!(finance.waive_penalty(late.id).await.unwrap());
    assert!(!finance.waive_penalty(late.id).await.unwrap());
    assert_eq!(finance.outstanding_penalties(unit.id).await.unwrap(), 12_500);
}

#[tokio::test]
async fn test_attachment_approved_types() {
    let f = fixture().await;
    let unit = f.unit("K-1").await;
    let repo = AttachmentRepository::new(f.db.clone());

    let passport = Attachment {
        id: Uuid::new_v4(),
        unit_id: unit.id,
        owner_id: None,
        document_type: "passport".to_string(),
        file_name: "passport.pdf".to_string(),
        stored_path: format!("{}/x-passport.pdf", unit.id),
        content_type: "application/pdf".to_string(),
        size_bytes: 10,
        review_status: ReviewStatus::Pending,
        reviewed_by: None,
        created_at: Utc::now(),
    };
    let deed = Attachment {
        id: Uuid::new_v4(),
        document_type: "sale_agreement".to_string(),
        ..passport.clone()
    };
    repo.insert(&passport).await.unwrap();
    repo.insert(&deed).await.unwrap();
    assert!(repo.approved_types(unit.id).await.unwrap().is_empty());

    repo.set_review(passport.id, ReviewStatus::Approved, "admin@example.com").await.unwrap();
    assert_eq!(repo.approved_types(unit.id).await.unwrap(), vec!["passport".to_string()]);
}

#[tokio::test]
async fn test_magic_link_first_use_is_kept() {
    let f = fixture().await;
    let repo = MagicLinkRepository::new(f.db.clone());
    let issued = tokens::generate();
    let link = MagicLink {
        id: Uuid::new_v4(),
        email: "sam@example.com".to_string(),
        token_hash: issued.hash.clone(),
        expires_at: Utc::now() + chrono::Duration::minutes(10),
        used_at: None,
        created_at: Utc::now(),
    };
    repo.insert(&link).await.unwrap();

    let first = Utc::now();
    repo.mark_used(link.id, first).await.unwrap();
    repo.mark_used(link.id, first + chrono::Duration::minutes(1)).await.unwrap();

    let stored = repo.find_by_hash(&tokens::hash(&issued.token)).await.unwrap().unwrap();
    assert_eq!(stored.used_at.map(|t| t.timestamp()), Some(first.timestamp()));
    assert!(!stored.is_expired(Utc::now()));
}

#[tokio::test]
async fn test_email_log_listing_is_scoped() {
    let f = fixture().await;
    let unit = f.unit("L-1").await;
    let repo = EmailLogRepository::new(f.db.clone());

    for unit_id in [Some(unit.id), None] {
        repo.insert(&handover_db::EmailLog {
            id: Uuid::new_v4(),
            recipient: "sam@example.com".to_string(),
            subject: "Hello".to_string(),
            template: "magic_link".to_string(),
            status: handover_common::EmailStatus::Sent,
            error: None,
            unit_id,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    }

    assert_eq!(repo.list(Some(unit.id), 50).await.unwrap().len(), 1);
    assert_eq!(repo.list(None, 50).await.unwrap().len(), 2);
    assert_eq!(repo.list(None, 1).await.unwrap().len(), 1);
}
