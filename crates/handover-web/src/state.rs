//! Shared application state for the web server.

use chrono::NaiveDate;
use handover_common::PaymentStatus;
use handover_core::Services;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events pushed to connected dashboards via SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    BookingCreated {
        booking_id: Uuid,
        unit_id: Uuid,
        property_id: Uuid,
        date: NaiveDate,
        slot: String,
    },
    BookingRescheduled {
        booking_id: Uuid,
        unit_id: Uuid,
        property_id: Uuid,
        date: NaiveDate,
        slot: String,
    },
    BookingCancelled { booking_id: Uuid, unit_id: Uuid, property_id: Uuid },
    HandoverCompleted { booking_id: Uuid, unit_id: Uuid, property_id: Uuid },
    PaymentStatusChanged { unit_id: Uuid, status: PaymentStatus },
}

/// Shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self { services, event_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    /// Fire-and-forget; having no subscribers is fine.
    pub fn publish(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }
}

pub type SharedState = Arc<AppState>;
