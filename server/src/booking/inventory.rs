//! Seat allocation for a single event.
//!
//! A reservation locks the event row, takes one seat off the counter and
//! writes the ticket in the same transaction. Concurrent reservations on one
//! event queue behind the row lock, so an event never hands out more tickets
//! than it has seats.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::status::event_transition_allowed;
use super::{BookingError, BookingResult};
use crate::models::{Event, EventStatus, Ticket};
use crate::store::Ledger;

/// Takes one seat from a locked event.
///
/// The last seat flips the event to `SoldOut` where the lifecycle allows it.
pub fn claim_seat(event: &mut Event, now: DateTime<Utc>) -> BookingResult<()> {
    if event.status.is_terminal() {
        return Err(BookingError::EventNotBookable {
            id: event.id,
            status: event.status.to_string(),
        });
    }
    if event.available_tickets <= 0 {
        return Err(BookingError::OutOfStock(event.id));
    }
    if event.status == EventStatus::SoldOut {
        // Counter and status disagree; refuse rather than sell into it.
        return Err(BookingError::EventNotBookable {
            id: event.id,
            status: event.status.to_string(),
        });
    }

    event.available_tickets -= 1;
    if event.available_tickets == 0 && event_transition_allowed(event.status, EventStatus::SoldOut)
    {
        event.status = EventStatus::SoldOut;
    }
    event.updated_at = now;
    Ok(())
}

#[derive(Clone)]
pub struct InventoryController {
    ledger: Arc<dyn Ledger>,
}

impl InventoryController {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Books one seat for `user_id`. Nothing is written unless the whole
    /// reservation commits.
    pub async fn reserve(&self, event_id: Uuid, user_id: Uuid) -> BookingResult<Ticket> {
        let mut tx = self.ledger.begin().await?;

        let mut event = tx
            .lock_event(event_id)
            .await?
            .ok_or_else(|| BookingError::not_found("event", event_id))?;

        if !tx.user_exists(user_id).await? {
            return Err(BookingError::not_found("user", user_id));
        }

        let now = Utc::now();
        if let Err(err) = claim_seat(&mut event, now) {
            debug!(%event_id, %user_id, error = %err, "Reservation refused");
            return Err(err);
        }

        tx.save_event_state(&event).await?;
        let ticket = Ticket::purchased(event_id, user_id, now);
        tx.insert_ticket(&ticket).await?;
        tx.commit().await?;

        info!(
            %event_id,
            %user_id,
            ticket_id = %ticket.id,
            available_tickets = event.available_tickets,
            status = %event.status,
            "Ticket reserved"
        );
        Ok(ticket)
    }
}
