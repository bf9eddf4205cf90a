//! Storage capabilities used by the booking core.
//!
//! Each entity gets its own read/write trait. Every write that touches an
//! event's seat counter or status goes through a [`LedgerTx`], which holds an
//! exclusive lock on the rows it has loaded until it is committed or dropped.
//! Dropping a transaction without committing discards its writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::BookingResult;
use crate::models::{
    DateWindow, Event, EventFilter, EventStatusRollup, RoleRollup, Ticket, TicketStatusRollup,
    TicketsSoldPerEvent, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: &Event) -> BookingResult<()>;
    async fn find_event(&self, id: Uuid) -> BookingResult<Option<Event>>;
    async fn list_events(&self) -> BookingResult<Vec<Event>>;
    async fn search_events(&self, filter: &EventFilter) -> BookingResult<Vec<Event>>;
    /// Whether another event already uses `name`, ignoring `excluding`.
    async fn event_name_taken(&self, name: &str, excluding: Option<Uuid>) -> BookingResult<bool>;
    /// Writes the descriptive columns only. Returns false if the event is gone.
    async fn update_event_details(&self, event: &Event) -> BookingResult<bool>;
    /// Deletes the event and its tickets. Returns false if nothing was deleted.
    async fn delete_event(&self, id: Uuid) -> BookingResult<bool>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn find_ticket(&self, id: Uuid) -> BookingResult<Option<Ticket>>;
    async fn list_tickets(&self) -> BookingResult<Vec<Ticket>>;
    async fn list_tickets_for_user(&self, user_id: Uuid) -> BookingResult<Vec<Ticket>>;
    async fn list_tickets_for_event(&self, event_id: Uuid) -> BookingResult<Vec<Ticket>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> BookingResult<()>;
    async fn find_user(&self, id: Uuid) -> BookingResult<Option<User>>;
    async fn list_users(&self) -> BookingResult<Vec<User>>;
    /// Writes name, email, role and `updated_at`. Returns false if the user is gone.
    async fn update_user(&self, user: &User) -> BookingResult<bool>;
    /// Whether another user already uses `email`, ignoring `excluding`.
    async fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> BookingResult<bool>;
}

/// Grouped aggregates. Each method is a single query over one snapshot.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn event_status_rollup(&self, window: DateWindow)
        -> BookingResult<Vec<EventStatusRollup>>;
    async fn ticket_status_rollup(
        &self,
        window: DateWindow,
    ) -> BookingResult<Vec<TicketStatusRollup>>;
    async fn tickets_sold_per_event(
        &self,
        window: DateWindow,
        event_id: Option<Uuid>,
    ) -> BookingResult<Vec<TicketsSoldPerEvent>>;
    async fn role_rollup(&self, window: DateWindow) -> BookingResult<Vec<RoleRollup>>;
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn begin(&self) -> BookingResult<Box<dyn LedgerTx>>;
}

#[async_trait]
pub trait LedgerTx: Send {
    /// Loads the event and holds its row lock until the transaction ends.
    async fn lock_event(&mut self, id: Uuid) -> BookingResult<Option<Event>>;
    async fn lock_ticket(&mut self, id: Uuid) -> BookingResult<Option<Ticket>>;
    /// Holds a shared lock on the user row so it cannot be deleted underneath
    /// a booking.
    async fn user_exists(&mut self, id: Uuid) -> BookingResult<bool>;
    /// Loads the user and holds its row lock until the transaction ends.
    async fn lock_user(&mut self, id: Uuid) -> BookingResult<Option<User>>;
    async fn user_holds_purchased_tickets(&mut self, user_id: Uuid) -> BookingResult<bool>;
    /// Deletes the user together with their remaining tickets.
    async fn delete_user(&mut self, id: Uuid) -> BookingResult<()>;
    /// Persists `available_tickets`, `status` and `updated_at` of a locked event.
    async fn save_event_state(&mut self, event: &Event) -> BookingResult<()>;
    async fn insert_ticket(&mut self, ticket: &Ticket) -> BookingResult<()>;
    async fn save_ticket_status(&mut self, ticket: &Ticket) -> BookingResult<()>;
    /// Moves every Purchased ticket of the event to Cancelled.
    async fn cancel_purchased_tickets(
        &mut self,
        event_id: Uuid,
        at: DateTime<Utc>,
    ) -> BookingResult<u64>;
    async fn delete_ticket(&mut self, id: Uuid) -> BookingResult<()>;
    async fn commit(self: Box<Self>) -> BookingResult<()>;
}
