use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::BookingResult;
use crate::models::{DateWindow, EventReport, TicketReport, TicketsSoldPerEvent, UserReport};
use crate::store::ReportStore;

/// Read-only aggregates over events, tickets and users.
#[derive(Clone)]
pub struct ReportAggregator {
    store: Arc<dyn ReportStore>,
}

impl ReportAggregator {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    pub async fn event_report(&self, window: DateWindow) -> BookingResult<EventReport> {
        window.validate()?;
        let rows = self.store.event_status_rollup(window).await?;
        debug!(?window, groups = rows.len(), "Event report computed");
        Ok(EventReport::from_rollups(&rows))
    }

    pub async fn ticket_report(&self, window: DateWindow) -> BookingResult<TicketReport> {
        window.validate()?;
        let rows = self.store.ticket_status_rollup(window).await?;
        debug!(?window, groups = rows.len(), "Ticket report computed");
        Ok(TicketReport::from_rollups(&rows))
    }

    pub async fn tickets_sold_per_event(
        &self,
        window: DateWindow,
        event_id: Option<Uuid>,
    ) -> BookingResult<Vec<TicketsSoldPerEvent>> {
        window.validate()?;
        self.store.tickets_sold_per_event(window, event_id).await
    }

    pub async fn user_report(&self, window: DateWindow) -> BookingResult<UserReport> {
        window.validate()?;
        let rows = self.store.role_rollup(window).await?;
        Ok(UserReport::from_rollups(&rows))
    }
}
