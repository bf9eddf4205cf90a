use std::sync::Arc;

use uuid::Uuid;

use super::{BookingError, BookingResult, InventoryController, StatusMachine};
use crate::models::{CreateTicketRequest, TicketStatus, TicketView, UpdateTicketRequest};
use crate::store::{Ledger, TicketStore};

/// Entry point for ticket purchases, cancellations and lookups.
#[derive(Clone)]
pub struct BookingService {
    inventory: InventoryController,
    status: StatusMachine,
    tickets: Arc<dyn TicketStore>,
}

impl BookingService {
    pub fn new(ledger: Arc<dyn Ledger>, tickets: Arc<dyn TicketStore>) -> Self {
        Self {
            inventory: InventoryController::new(ledger.clone()),
            status: StatusMachine::new(ledger),
            tickets,
        }
    }

    pub async fn book(&self, request: CreateTicketRequest) -> BookingResult<TicketView> {
        let ticket = self
            .inventory
            .reserve(request.event_id, request.user_id)
            .await?;
        Ok(ticket.into())
    }

    /// Cancels one ticket. The event's seat counter is left as it is.
    pub async fn cancel_ticket(&self, ticket_id: Uuid) -> BookingResult<TicketView> {
        let ticket = self
            .status
            .transition_ticket(ticket_id, TicketStatus::Cancelled)
            .await?;
        Ok(ticket.into())
    }

    pub async fn update_ticket(
        &self,
        ticket_id: Uuid,
        request: UpdateTicketRequest,
    ) -> BookingResult<TicketView> {
        let ticket = self
            .status
            .transition_ticket(ticket_id, request.status)
            .await?;
        Ok(ticket.into())
    }

    pub async fn delete_ticket(&self, ticket_id: Uuid) -> BookingResult<()> {
        self.status.delete_ticket(ticket_id).await
    }

    pub async fn get_ticket(&self, ticket_id: Uuid) -> BookingResult<TicketView> {
        self.tickets
            .find_ticket(ticket_id)
            .await?
            .map(TicketView::from)
            .ok_or_else(|| BookingError::not_found("ticket", ticket_id))
    }

    pub async fn list_tickets(&self) -> BookingResult<Vec<TicketView>> {
        let tickets = self.tickets.list_tickets().await?;
        Ok(tickets.into_iter().map(TicketView::from).collect())
    }

    pub async fn list_tickets_for_user(&self, user_id: Uuid) -> BookingResult<Vec<TicketView>> {
        let tickets = self.tickets.list_tickets_for_user(user_id).await?;
        Ok(tickets.into_iter().map(TicketView::from).collect())
    }
}
