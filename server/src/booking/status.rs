//! Legal status transitions for events and tickets, and the cancellation
//! cascade that keeps the two in step.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{BookingError, BookingResult};
use crate::models::{Event, EventStatus, Ticket, TicketStatus};
use crate::store::Ledger;

pub fn event_transition_allowed(from: EventStatus, to: EventStatus) -> bool {
    use EventStatus::*;

    matches!(
        (from, to),
        (Active, Ongoing)
            | (Active, Cancelled)
            | (Active, SoldOut)
            | (Ongoing, Completed)
            | (Ongoing, Cancelled)
            | (SoldOut, Cancelled)
    )
}

pub fn ensure_event_transition(from: EventStatus, to: EventStatus) -> BookingResult<()> {
    if event_transition_allowed(from, to) {
        Ok(())
    } else {
        Err(BookingError::invalid_transition("event", from, to))
    }
}

pub fn ticket_transition_allowed(from: TicketStatus, to: TicketStatus) -> bool {
    matches!((from, to), (TicketStatus::Purchased, TicketStatus::Cancelled))
}

pub fn ensure_ticket_transition(from: TicketStatus, to: TicketStatus) -> BookingResult<()> {
    if ticket_transition_allowed(from, to) {
        Ok(())
    } else {
        Err(BookingError::invalid_transition("ticket", from, to))
    }
}

/// Outcome of cancelling an event.
#[derive(Debug, Clone)]
pub struct CancelledEvent {
    pub event: Event,
    pub tickets_cancelled: u64,
}

/// Applies status changes inside a single ledger transaction each.
#[derive(Clone)]
pub struct StatusMachine {
    ledger: Arc<dyn Ledger>,
}

impl StatusMachine {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Cancels the event and every Purchased ticket it has, atomically.
    pub async fn cancel_event(&self, event_id: Uuid) -> BookingResult<CancelledEvent> {
        let mut tx = self.ledger.begin().await?;
        let mut event = tx
            .lock_event(event_id)
            .await?
            .ok_or_else(|| BookingError::not_found("event", event_id))?;

        ensure_event_transition(event.status, EventStatus::Cancelled)?;

        let now = Utc::now();
        event.status = EventStatus::Cancelled;
        event.updated_at = now;
        tx.save_event_state(&event).await?;
        let tickets_cancelled = tx.cancel_purchased_tickets(event_id, now).await?;
        tx.commit().await?;

        info!(%event_id, tickets_cancelled, "Event cancelled");
        Ok(CancelledEvent {
            event,
            tickets_cancelled,
        })
    }

    /// Moves an event along its lifecycle on an operator's request.
    ///
    /// Cancellation always cascades. `SoldOut` is only ever set by a booking.
    pub async fn change_event_status(
        &self,
        event_id: Uuid,
        target: EventStatus,
    ) -> BookingResult<Event> {
        if target == EventStatus::Cancelled {
            return Ok(self.cancel_event(event_id).await?.event);
        }

        let mut tx = self.ledger.begin().await?;
        let mut event = tx
            .lock_event(event_id)
            .await?
            .ok_or_else(|| BookingError::not_found("event", event_id))?;

        if target == EventStatus::SoldOut {
            warn!(%event_id, "Rejected manual transition to SoldOut");
            return Err(BookingError::invalid_transition("event", event.status, target));
        }
        ensure_event_transition(event.status, target)?;

        let from = event.status;
        event.status = target;
        event.updated_at = Utc::now();
        tx.save_event_state(&event).await?;
        tx.commit().await?;

        info!(%event_id, %from, to = %target, "Event status changed");
        Ok(event)
    }

    pub async fn transition_ticket(
        &self,
        ticket_id: Uuid,
        target: TicketStatus,
    ) -> BookingResult<Ticket> {
        let mut tx = self.ledger.begin().await?;
        let mut ticket = tx
            .lock_ticket(ticket_id)
            .await?
            .ok_or_else(|| BookingError::not_found("ticket", ticket_id))?;

        ensure_ticket_transition(ticket.status, target)?;

        ticket.status = target;
        ticket.updated_at = Utc::now();
        tx.save_ticket_status(&ticket).await?;
        tx.commit().await?;

        info!(%ticket_id, event_id = %ticket.event_id, status = %target, "Ticket status changed");
        Ok(ticket)
    }

    /// Removes a ticket record. Only cancelled tickets may go, so the event's
    /// seat counter never loses track of a live booking.
    pub async fn delete_ticket(&self, ticket_id: Uuid) -> BookingResult<()> {
        let mut tx = self.ledger.begin().await?;
        let ticket = tx
            .lock_ticket(ticket_id)
            .await?
            .ok_or_else(|| BookingError::not_found("ticket", ticket_id))?;

        if ticket.status != TicketStatus::Cancelled {
            return Err(BookingError::invalid_transition(
                "ticket",
                ticket.status,
                "Deleted",
            ));
        }

        tx.delete_ticket(ticket_id).await?;
        tx.commit().await?;

        info!(%ticket_id, "Ticket deleted");
        Ok(())
    }
}
