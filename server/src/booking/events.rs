use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{BookingError, BookingResult, StatusMachine};
use crate::models::{
    CreateEventRequest, Event, EventFilter, EventStatus, EventView, UpdateEventRequest,
};
use crate::store::{EventStore, Ledger};

/// Event catalogue: creation, lookup, search and descriptive edits, plus the
/// lifecycle operations delegated to the [`StatusMachine`].
#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventStore>,
    status: StatusMachine,
}

impl EventService {
    pub fn new(events: Arc<dyn EventStore>, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            events,
            status: StatusMachine::new(ledger),
        }
    }

    pub async fn create_event(&self, request: CreateEventRequest) -> BookingResult<EventView> {
        request.validate()?;
        if self.events.event_name_taken(&request.name, None).await? {
            return Err(duplicate_name(&request.name));
        }

        let event = Event::open(request, Utc::now());
        self.events.insert_event(&event).await?;

        info!(event_id = %event.id, capacity = event.capacity, "Event created");
        Ok(event.into())
    }

    pub async fn get_event(&self, event_id: Uuid) -> BookingResult<EventView> {
        Ok(self.load(event_id).await?.into())
    }

    pub async fn list_events(&self) -> BookingResult<Vec<EventView>> {
        let events = self.events.list_events().await?;
        Ok(events.into_iter().map(EventView::from).collect())
    }

    pub async fn search_events(&self, filter: EventFilter) -> BookingResult<Vec<EventView>> {
        filter.validate()?;
        let events = self.events.search_events(&filter).await?;
        Ok(events.into_iter().map(EventView::from).collect())
    }

    /// Edits descriptive fields. Seat counter and status are never written here.
    pub async fn update_event(
        &self,
        event_id: Uuid,
        request: UpdateEventRequest,
    ) -> BookingResult<EventView> {
        request.validate()?;
        let mut event = self.load(event_id).await?;

        if let Some(name) = request.name.as_deref() {
            if name != event.name && self.events.event_name_taken(name, Some(event_id)).await? {
                return Err(duplicate_name(name));
            }
        }

        request.apply(&mut event, Utc::now());
        if !self.events.update_event_details(&event).await? {
            return Err(BookingError::not_found("event", event_id));
        }

        info!(%event_id, "Event details updated");
        self.get_event(event_id).await
    }

    pub async fn change_status(
        &self,
        event_id: Uuid,
        target: EventStatus,
    ) -> BookingResult<EventView> {
        let event = self.status.change_event_status(event_id, target).await?;
        Ok(event.into())
    }

    pub async fn cancel_event(&self, event_id: Uuid) -> BookingResult<EventView> {
        let outcome = self.status.cancel_event(event_id).await?;
        Ok(outcome.event.into())
    }

    pub async fn delete_event(&self, event_id: Uuid) -> BookingResult<()> {
        if !self.events.delete_event(event_id).await? {
            return Err(BookingError::not_found("event", event_id));
        }
        info!(%event_id, "Event deleted");
        Ok(())
    }

    async fn load(&self, event_id: Uuid) -> BookingResult<Event> {
        self.events
            .find_event(event_id)
            .await?
            .ok_or_else(|| BookingError::not_found("event", event_id))
    }
}

fn duplicate_name(name: &str) -> BookingError {
    BookingError::DuplicateName(format!("event name '{}' already exists", name))
}
