//! Application services, one per area. Each takes the authenticated caller,
//! checks access, validates input and performs the side effects.

pub mod auth;
pub mod bookings;
pub mod documents;
pub mod finance;
pub mod ownership;
pub mod properties;
pub mod remarks;
pub mod units;

use crate::context::ServiceContext;
use std::sync::Arc;

pub use auth::{AuthService, CallerProfile, IssuedDeveloperLink};
pub use bookings::{BookingService, DayAvailability, NewBooking, Reschedule};
pub use documents::{DocumentService, Upload};
pub use finance::{FinanceService, FinanceSummary, NewPenalty, NewPop, NewSoa, PopReviewOutcome};
pub use ownership::{AttachOwner, OwnershipService};
pub use properties::{NewProperty, PropertyService, PropertyUpdate};
pub use remarks::RemarkService;
pub use units::{NewUnit, UnitDetail, UnitService, UnitUpdate};

/// All services over one shared context.
#[derive(Clone)]
pub struct Services {
    pub ctx: Arc<ServiceContext>,
    pub properties: PropertyService,
    pub units: UnitService,
    pub ownership: OwnershipService,
    pub bookings: BookingService,
    pub documents: DocumentService,
    pub finance: FinanceService,
    pub auth: AuthService,
    pub remarks: RemarkService,
}

impl Services {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            properties: PropertyService::new(ctx.clone()),
            units: UnitService::new(ctx.clone()),
            ownership: OwnershipService::new(ctx.clone()),
            bookings: BookingService::new(ctx.clone()),
            documents: DocumentService::new(ctx.clone()),
            finance: FinanceService::new(ctx.clone()),
            auth: AuthService::new(ctx.clone()),
            remarks: RemarkService::new(ctx.clone()),
            ctx,
        }
    }
}
