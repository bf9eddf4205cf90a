//! In-process store with the same contracts as [`PgStore`](super::PgStore).
//!
//! A transaction owns the store mutex for its whole lifetime and writes in
//! place, recording the prior value of every row it touches. Commit forgets
//! the log; dropping an uncommitted transaction replays it in reverse.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{EventStore, Ledger, LedgerTx, ReportStore, TicketStore, UserStore};
use crate::booking::{BookingError, BookingResult};
use crate::models::{
    DateWindow, Event, EventFilter, EventStatusRollup, RoleRollup, Ticket, TicketStatus,
    TicketStatusRollup, TicketsSoldPerEvent, User,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    events: HashMap<Uuid, Event>,
    tickets: HashMap<Uuid, Ticket>,
    users: HashMap<Uuid, User>,
}

impl MemoryState {
    fn sorted_events(&self, keep: impl Fn(&Event) -> bool) -> Vec<Event> {
        let mut events: Vec<Event> = self.events.values().filter(|e| keep(e)).cloned().collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        events
    }

    fn sorted_tickets(&self, keep: impl Fn(&Ticket) -> bool) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self.tickets.values().filter(|t| keep(t)).cloned().collect();
        tickets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tickets
    }

    /// Tickets in the window joined with their event.
    fn priced_tickets(&self, window: DateWindow) -> impl Iterator<Item = (&Ticket, &Event)> + '_ {
        self.tickets.values().filter_map(move |ticket| {
            if !window.contains_instant(ticket.created_at) {
                return None;
            }
            self.events.get(&ticket.event_id).map(|event| (ticket, event))
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> BookingResult<()> {
        let mut state = self.state.lock().await;
        if state.events.values().any(|e| e.name == event.name) {
            return Err(BookingError::DuplicateName(format!(
                "event name '{}' already exists",
                event.name
            )));
        }
        state.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> BookingResult<Option<Event>> {
        Ok(self.state.lock().await.events.get(&id).cloned())
    }

    async fn list_events(&self) -> BookingResult<Vec<Event>> {
        Ok(self.state.lock().await.sorted_events(|_| true))
    }

    async fn search_events(&self, filter: &EventFilter) -> BookingResult<Vec<Event>> {
        Ok(self.state.lock().await.sorted_events(|e| filter.matches(e)))
    }

    async fn event_name_taken(&self, name: &str, excluding: Option<Uuid>) -> BookingResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .values()
            .any(|e| e.name == name && Some(e.id) != excluding))
    }

    async fn update_event_details(&self, event: &Event) -> BookingResult<bool> {
        let mut state = self.state.lock().await;
        if state
            .events
            .values()
            .any(|e| e.name == event.name && e.id != event.id)
        {
            return Err(BookingError::DuplicateName(format!(
                "event name '{}' already exists",
                event.name
            )));
        }
        let Some(stored) = state.events.get_mut(&event.id) else {
            return Ok(false);
        };
        stored.name = event.name.clone();
        stored.description = event.description.clone();
        stored.location = event.location.clone();
        stored.date = event.date;
        stored.category = event.category.clone();
        stored.price = event.price;
        stored.updated_at = event.updated_at;
        Ok(true)
    }

    async fn delete_event(&self, id: Uuid) -> BookingResult<bool> {
        let mut state = self.state.lock().await;
        if state.events.remove(&id).is_none() {
            return Ok(false);
        }
        state.tickets.retain(|_, t| t.event_id != id);
        Ok(true)
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn find_ticket(&self, id: Uuid) -> BookingResult<Option<Ticket>> {
        Ok(self.state.lock().await.tickets.get(&id).cloned())
    }

    async fn list_tickets(&self) -> BookingResult<Vec<Ticket>> {
        Ok(self.state.lock().await.sorted_tickets(|_| true))
    }

    async fn list_tickets_for_user(&self, user_id: Uuid) -> BookingResult<Vec<Ticket>> {
        Ok(self
            .state
            .lock()
            .await
            .sorted_tickets(|t| t.user_id == user_id))
    }

    async fn list_tickets_for_event(&self, event_id: Uuid) -> BookingResult<Vec<Ticket>> {
        Ok(self
            .state
            .lock()
            .await
            .sorted_tickets(|t| t.event_id == event_id))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> BookingResult<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(BookingError::DuplicateName(format!(
                "email '{}' is already registered",
                user.email
            )));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> BookingResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn list_users(&self) -> BookingResult<Vec<User>> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> BookingResult<bool> {
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(BookingError::DuplicateName(format!(
                "email '{}' is already registered",
                user.email
            )));
        }
        let Some(stored) = state.users.get_mut(&user.id) else {
            return Ok(false);
        };
        stored.name = user.name.clone();
        stored.email = user.email.clone();
        stored.role = user.role;
        stored.updated_at = user.updated_at;
        Ok(true)
    }

    async fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> BookingResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .any(|u| u.email == email && Some(u.id) != excluding))
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn event_status_rollup(
        &self,
        window: DateWindow,
    ) -> BookingResult<Vec<EventStatusRollup>> {
        let state = self.state.lock().await;
        let mut rows: Vec<EventStatusRollup> = Vec::new();
        for event in state.events.values().filter(|e| window.contains_date(e.date)) {
            let idx = match rows.iter().position(|r| r.status == event.status) {
                Some(idx) => idx,
                None => {
                    rows.push(EventStatusRollup {
                        status: event.status,
                        event_count: 0,
                        total_capacity: 0,
                        tickets_booked: 0,
                    });
                    rows.len() - 1
                }
            };
            let row = &mut rows[idx];
            row.event_count += 1;
            row.total_capacity += i64::from(event.capacity);
            row.tickets_booked += i64::from(event.tickets_booked());
        }
        Ok(rows)
    }

    async fn ticket_status_rollup(
        &self,
        window: DateWindow,
    ) -> BookingResult<Vec<TicketStatusRollup>> {
        let state = self.state.lock().await;
        let rows = TicketStatus::ALL
            .into_iter()
            .filter_map(|status| {
                let (count, revenue) = state
                    .priced_tickets(window)
                    .filter(|(ticket, _)| ticket.status == status)
                    .fold((0i64, Decimal::ZERO), |(count, revenue), (_, event)| {
                        (count + 1, revenue + event.price)
                    });
                (count > 0).then_some(TicketStatusRollup {
                    status,
                    total_tickets: count,
                    total_revenue: revenue,
                })
            })
            .collect();
        Ok(rows)
    }

    async fn tickets_sold_per_event(
        &self,
        window: DateWindow,
        event_id: Option<Uuid>,
    ) -> BookingResult<Vec<TicketsSoldPerEvent>> {
        let state = self.state.lock().await;
        let mut rows: HashMap<Uuid, TicketsSoldPerEvent> = HashMap::new();
        for (ticket, event) in state.priced_tickets(window) {
            if ticket.status != TicketStatus::Purchased || event_id.is_some_and(|id| id != event.id)
            {
                continue;
            }
            let row = rows.entry(event.id).or_insert_with(|| TicketsSoldPerEvent {
                event_id: event.id,
                event_name: event.name.clone(),
                total_tickets: 0,
                total_revenue: Decimal::ZERO,
            });
            row.total_tickets += 1;
            row.total_revenue += event.price;
        }
        let mut rows: Vec<_> = rows.into_values().collect();
        rows.sort_by(|a, b| a.event_name.cmp(&b.event_name).then(a.event_id.cmp(&b.event_id)));
        Ok(rows)
    }

    async fn role_rollup(&self, window: DateWindow) -> BookingResult<Vec<RoleRollup>> {
        let state = self.state.lock().await;
        let mut rows: Vec<RoleRollup> = Vec::new();
        for user in state.users.values().filter(|u| window.contains_instant(u.created_at)) {
            match rows.iter_mut().find(|r| r.role == user.role) {
                Some(row) => row.total_users += 1,
                None => rows.push(RoleRollup {
                    role: user.role,
                    total_users: 1,
                }),
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl Ledger for MemoryStore {
    async fn begin(&self) -> BookingResult<Box<dyn LedgerTx>> {
        let state = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTx {
            state,
            undo: Vec::new(),
        }))
    }
}

/// Prior value of a row a transaction has written.
enum Undo {
    Event(Event),
    /// The ticket was updated or deleted; put this version back.
    Ticket(Ticket),
    /// The ticket was inserted; remove it.
    TicketInserted(Uuid),
    User(User),
}

struct MemoryTx {
    state: OwnedMutexGuard<MemoryState>,
    undo: Vec<Undo>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Event(event) => {
                    self.state.events.insert(event.id, event);
                }
                Undo::Ticket(ticket) => {
                    self.state.tickets.insert(ticket.id, ticket);
                }
                Undo::TicketInserted(id) => {
                    self.state.tickets.remove(&id);
                }
                Undo::User(user) => {
                    self.state.users.insert(user.id, user);
                }
            }
        }
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_event(&mut self, id: Uuid) -> BookingResult<Option<Event>> {
        Ok(self.state.events.get(&id).cloned())
    }

    async fn lock_ticket(&mut self, id: Uuid) -> BookingResult<Option<Ticket>> {
        Ok(self.state.tickets.get(&id).cloned())
    }

    async fn user_exists(&mut self, id: Uuid) -> BookingResult<bool> {
        Ok(self.state.users.contains_key(&id))
    }

    async fn lock_user(&mut self, id: Uuid) -> BookingResult<Option<User>> {
        Ok(self.state.users.get(&id).cloned())
    }

    async fn user_holds_purchased_tickets(&mut self, user_id: Uuid) -> BookingResult<bool> {
        Ok(self
            .state
            .tickets
            .values()
            .any(|t| t.user_id == user_id && t.status == TicketStatus::Purchased))
    }

    async fn delete_user(&mut self, id: Uuid) -> BookingResult<()> {
        let owned: Vec<Uuid> = self
            .state
            .tickets
            .values()
            .filter(|t| t.user_id == id)
            .map(|t| t.id)
            .collect();
        for ticket_id in owned {
            if let Some(ticket) = self.state.tickets.remove(&ticket_id) {
                self.undo.push(Undo::Ticket(ticket));
            }
        }
        if let Some(user) = self.state.users.remove(&id) {
            self.undo.push(Undo::User(user));
        }
        Ok(())
    }

    async fn save_event_state(&mut self, event: &Event) -> BookingResult<()> {
        let stored = self
            .state
            .events
            .get_mut(&event.id)
            .ok_or_else(|| BookingError::not_found("event", event.id))?;
        self.undo.push(Undo::Event(stored.clone()));
        stored.available_tickets = event.available_tickets;
        stored.status = event.status;
        stored.updated_at = event.updated_at;
        Ok(())
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> BookingResult<()> {
        self.state.tickets.insert(ticket.id, ticket.clone());
        self.undo.push(Undo::TicketInserted(ticket.id));
        Ok(())
    }

    async fn save_ticket_status(&mut self, ticket: &Ticket) -> BookingResult<()> {
        let stored = self
            .state
            .tickets
            .get_mut(&ticket.id)
            .ok_or_else(|| BookingError::not_found("ticket", ticket.id))?;
        self.undo.push(Undo::Ticket(stored.clone()));
        stored.status = ticket.status;
        stored.updated_at = ticket.updated_at;
        Ok(())
    }

    async fn cancel_purchased_tickets(
        &mut self,
        event_id: Uuid,
        at: DateTime<Utc>,
    ) -> BookingResult<u64> {
        let mut cancelled = 0;
        let MemoryTx { state, undo } = self;
        for ticket in state.tickets.values_mut() {
            if ticket.event_id == event_id && ticket.status == TicketStatus::Purchased {
                undo.push(Undo::Ticket(ticket.clone()));
                ticket.status = TicketStatus::Cancelled;
                ticket.updated_at = at;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn delete_ticket(&mut self, id: Uuid) -> BookingResult<()> {
        if let Some(ticket) = self.state.tickets.remove(&id) {
            self.undo.push(Undo::Ticket(ticket));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> BookingResult<()> {
        let mut tx = self;
        tx.undo.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::fixtures;

    #[tokio::test]
    async fn test_dropped_transaction_restores_every_touched_row() {
        let store = MemoryStore::new();
        let event = fixtures::seed_event(&store, "Rollback", 3, 10).await;
        let user = fixtures::seed_user(&store).await;

        {
            let mut tx = store.begin().await.unwrap();
            let mut locked = tx.lock_event(event.id).await.unwrap().unwrap();
            locked.available_tickets = 2;
            tx.save_event_state(&locked).await.unwrap();
            tx.insert_ticket(&Ticket::purchased(event.id, user.id, Utc::now()))
                .await
                .unwrap();
            tx.delete_user(user.id).await.unwrap();
        }

        let stored = store.find_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.available_tickets, 3);
        assert!(store.list_tickets().await.unwrap().is_empty());
        assert!(store.find_user(user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_committed_transaction_keeps_its_writes() {
        let store = MemoryStore::new();
        let event = fixtures::seed_event(&store, "Commit", 3, 10).await;
        let user = fixtures::seed_user(&store).await;

        let mut tx = store.begin().await.unwrap();
        tx.insert_ticket(&Ticket::purchased(event.id, user.id, Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.list_tickets_for_user(user.id).await.unwrap().len(), 1);
    }
}
