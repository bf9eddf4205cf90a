use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{EventStore, Ledger, LedgerTx, ReportStore, TicketStore, UserStore};
use crate::booking::{BookingError, BookingResult};
use crate::config::Config;
use crate::models::{
    DateWindow, Event, EventFilter, EventStatusRollup, RoleRollup, Ticket, TicketStatus,
    TicketStatusRollup, TicketsSoldPerEvent, User,
};

const EVENT_COLUMNS: &str = "id, name, description, location, date, category, capacity, price, \
                             available_tickets, status, created_at, updated_at";

const TICKET_COLUMNS: &str = "id, event_id, user_id, status, created_at, updated_at";

const USER_COLUMNS: &str = "id, name, email, role, created_at, updated_at";

/// Postgres error code for a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub async fn connect(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool, config.lock_timeout))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }
}

/// Turns a unique-index violation into a name collision.
fn duplicate_or_store(err: sqlx::Error, message: impl FnOnce() -> String) -> BookingError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            BookingError::DuplicateName(message())
        }
        _ => BookingError::StoreFailure(err),
    }
}

/// `%needle%` with LIKE metacharacters escaped, for use with `ESCAPE '\'`.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Appends `AND <column> >= $start AND <column> < $end` for the window bounds
/// that are set.
fn push_window_instants(qb: &mut QueryBuilder<'_, Postgres>, column: &str, window: DateWindow) {
    if let Some(start) = window.start_instant() {
        qb.push(format!(" AND {} >= ", column)).push_bind(start);
    }
    if let Some(end) = window.end_instant_exclusive() {
        qb.push(format!(" AND {} < ", column)).push_bind(end);
    }
}

fn push_window_dates(qb: &mut QueryBuilder<'_, Postgres>, column: &str, window: DateWindow) {
    if let Some(start) = window.start_date {
        qb.push(format!(" AND {} >= ", column)).push_bind(start);
    }
    if let Some(end) = window.end_date {
        qb.push(format!(" AND {} <= ", column)).push_bind(end);
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn insert_event(&self, event: &Event) -> BookingResult<()> {
        sqlx::query(
            "INSERT INTO events (id, name, description, location, date, category, capacity, \
             price, available_tickets, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.date)
        .bind(&event.category)
        .bind(event.capacity)
        .bind(event.price)
        .bind(event.available_tickets)
        .bind(event.status)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            duplicate_or_store(e, || format!("event name '{}' already exists", event.name))
        })?;
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> BookingResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn list_events(&self) -> BookingResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events ORDER BY created_at, id",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn search_events(&self, filter: &EventFilter) -> BookingResult<Vec<Event>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM events WHERE TRUE",
            EVENT_COLUMNS
        ));

        if let Some(query) = filter.query.as_deref().filter(|q| !q.is_empty()) {
            let pattern = contains_pattern(query);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR location ILIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(min) = filter.min_price {
            qb.push(" AND price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            qb.push(" AND price <= ").push_bind(max);
        }
        if let Some(category) = filter.category.as_deref() {
            qb.push(" AND LOWER(category) = LOWER(")
                .push_bind(category.to_string())
                .push(")");
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        push_window_dates(&mut qb, "date", filter.window());
        qb.push(" ORDER BY created_at, id");

        let events = qb.build_query_as::<Event>().fetch_all(&self.pool).await?;
        Ok(events)
    }

    async fn event_name_taken(&self, name: &str, excluding: Option<Uuid>) -> BookingResult<bool> {
        let (taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM events \
             WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn update_event_details(&self, event: &Event) -> BookingResult<bool> {
        let result = sqlx::query(
            "UPDATE events SET name = $2, description = $3, location = $4, date = $5, \
             category = $6, price = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.date)
        .bind(&event.category)
        .bind(event.price)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            duplicate_or_store(e, || format!("event name '{}' already exists", event.name))
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_event(&self, id: Uuid) -> BookingResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn find_ticket(&self, id: Uuid) -> BookingResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {} FROM tickets WHERE id = $1",
            TICKET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn list_tickets(&self) -> BookingResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {} FROM tickets ORDER BY created_at, id",
            TICKET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    async fn list_tickets_for_user(&self, user_id: Uuid) -> BookingResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {} FROM tickets WHERE user_id = $1 ORDER BY created_at, id",
            TICKET_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    async fn list_tickets_for_event(&self, event_id: Uuid) -> BookingResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {} FROM tickets WHERE event_id = $1 ORDER BY created_at, id",
            TICKET_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> BookingResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            duplicate_or_store(e, || format!("email '{}' is already registered", user.email))
        })?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> BookingResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> BookingResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at, id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> BookingResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, role = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            duplicate_or_store(e, || format!("email '{}' is already registered", user.email))
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> BookingResult<bool> {
        let (taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users \
             WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn event_status_rollup(
        &self,
        window: DateWindow,
    ) -> BookingResult<Vec<EventStatusRollup>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT status, COUNT(*) AS event_count, \
             COALESCE(SUM(capacity), 0)::BIGINT AS total_capacity, \
             COALESCE(SUM(capacity - available_tickets), 0)::BIGINT AS tickets_booked \
             FROM events WHERE TRUE",
        );
        push_window_dates(&mut qb, "date", window);
        qb.push(" GROUP BY status");

        let rows = qb
            .build_query_as::<EventStatusRollup>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn ticket_status_rollup(
        &self,
        window: DateWindow,
    ) -> BookingResult<Vec<TicketStatusRollup>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT t.status, COUNT(t.id) AS total_tickets, \
             COALESCE(SUM(e.price), 0) AS total_revenue \
             FROM tickets t JOIN events e ON t.event_id = e.id WHERE TRUE",
        );
        push_window_instants(&mut qb, "t.created_at", window);
        qb.push(" GROUP BY t.status");

        let rows = qb
            .build_query_as::<TicketStatusRollup>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn tickets_sold_per_event(
        &self,
        window: DateWindow,
        event_id: Option<Uuid>,
    ) -> BookingResult<Vec<TicketsSoldPerEvent>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT e.id AS event_id, e.name AS event_name, COUNT(t.id) AS total_tickets, \
             COALESCE(SUM(e.price), 0) AS total_revenue \
             FROM tickets t JOIN events e ON t.event_id = e.id WHERE t.status = ",
        );
        qb.push_bind(TicketStatus::Purchased);
        push_window_instants(&mut qb, "t.created_at", window);
        if let Some(event_id) = event_id {
            qb.push(" AND e.id = ").push_bind(event_id);
        }
        qb.push(" GROUP BY e.id, e.name ORDER BY e.name, e.id");

        let rows = qb
            .build_query_as::<TicketsSoldPerEvent>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn role_rollup(&self, window: DateWindow) -> BookingResult<Vec<RoleRollup>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT role, COUNT(*) AS total_users FROM users WHERE TRUE",
        );
        push_window_instants(&mut qb, "created_at", window);
        qb.push(" GROUP BY role");

        let rows = qb.build_query_as::<RoleRollup>().fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

#[async_trait]
impl Ledger for PgStore {
    async fn begin(&self) -> BookingResult<Box<dyn LedgerTx>> {
        let mut tx = self.pool.begin().await?;
        // SET does not take bind parameters; the value is a plain integer.
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;
        Ok(Box::new(PgTx { tx }))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgTx {
    async fn lock_event(&mut self, id: Uuid) -> BookingResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1 FOR UPDATE",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(event)
    }

    async fn lock_ticket(&mut self, id: Uuid) -> BookingResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {} FROM tickets WHERE id = $1 FOR UPDATE",
            TICKET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(ticket)
    }

    async fn user_exists(&mut self, id: Uuid) -> BookingResult<bool> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR KEY SHARE")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(row.is_some())
    }

    async fn lock_user(&mut self, id: Uuid) -> BookingResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn user_holds_purchased_tickets(&mut self, user_id: Uuid) -> BookingResult<bool> {
        let (holds,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM tickets WHERE user_id = $1 AND status = $2)",
        )
        .bind(user_id)
        .bind(TicketStatus::Purchased)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(holds)
    }

    async fn delete_user(&mut self, id: Uuid) -> BookingResult<()> {
        // tickets.user_id cascades, taking the user's cancelled tickets with it.
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn save_event_state(&mut self, event: &Event) -> BookingResult<()> {
        let result = sqlx::query(
            "UPDATE events SET available_tickets = $2, status = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(event.id)
        .bind(event.available_tickets)
        .bind(event.status)
        .bind(event.updated_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(BookingError::not_found("event", event.id));
        }
        Ok(())
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> BookingResult<()> {
        sqlx::query(
            "INSERT INTO tickets (id, event_id, user_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(ticket.id)
        .bind(ticket.event_id)
        .bind(ticket.user_id)
        .bind(ticket.status)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn save_ticket_status(&mut self, ticket: &Ticket) -> BookingResult<()> {
        let result = sqlx::query("UPDATE tickets SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(ticket.id)
            .bind(ticket.status)
            .bind(ticket.updated_at)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BookingError::not_found("ticket", ticket.id));
        }
        Ok(())
    }

    async fn cancel_purchased_tickets(
        &mut self,
        event_id: Uuid,
        at: DateTime<Utc>,
    ) -> BookingResult<u64> {
        let result = sqlx::query(
            "UPDATE tickets SET status = $2, updated_at = $3 WHERE event_id = $1 AND status = $4",
        )
        .bind(event_id)
        .bind(TicketStatus::Cancelled)
        .bind(at)
        .bind(TicketStatus::Purchased)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_ticket(&mut self, id: Uuid) -> BookingResult<()> {
        sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> BookingResult<()> {
        let PgTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}
