use std::sync::Arc;

use crate::booking::{BookingService, EventService, ReportAggregator, UserService};
use crate::store::{EventStore, Ledger, ReportStore, TicketStore, UserStore};

/// Services shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub events: EventService,
    pub bookings: BookingService,
    pub reports: ReportAggregator,
    pub users: UserService,
}

impl AppState {
    /// Wires every service to one backing store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: EventStore + TicketStore + UserStore + ReportStore + Ledger + 'static,
    {
        Self {
            events: EventService::new(store.clone(), store.clone()),
            bookings: BookingService::new(store.clone(), store.clone()),
            reports: ReportAggregator::new(store.clone()),
            users: UserService::new(store.clone(), store),
        }
    }
}
