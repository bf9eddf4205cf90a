use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{EventStatus, Role, TicketStatus};
use crate::booking::BookingError;

/// Inclusive calendar-day range. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DateWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), BookingError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(BookingError::validation(
                "start_date must be on or before end_date",
            )),
            _ => Ok(()),
        }
    }

    /// First instant inside the window.
    pub fn start_instant(&self) -> Option<DateTime<Utc>> {
        self.start_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// First instant after the window, so the end day is covered in full.
    pub fn end_instant_exclusive(&self) -> Option<DateTime<Utc>> {
        self.end_date
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }

    pub fn contains_instant(&self, at: DateTime<Utc>) -> bool {
        self.start_instant().map_or(true, |start| at >= start)
            && self.end_instant_exclusive().map_or(true, |end| at < end)
    }
}

/// One group of the event rollup query.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct EventStatusRollup {
    pub status: EventStatus,
    pub event_count: i64,
    pub total_capacity: i64,
    pub tickets_booked: i64,
}

/// One group of the ticket rollup query.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TicketStatusRollup {
    pub status: TicketStatus,
    pub total_tickets: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RoleRollup {
    pub role: Role,
    pub total_users: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventStatusDistribution {
    pub event_status: EventStatus,
    pub total_events: i64,
    pub total_capacity: i64,
    pub tickets_booked: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventReport {
    pub total_events: i64,
    pub event_status_distribution: Vec<EventStatusDistribution>,
}

impl EventReport {
    /// Builds the report from grouped rows, adding a zero row for every
    /// status the query did not return.
    pub fn from_rollups(rows: &[EventStatusRollup]) -> Self {
        let event_status_distribution: Vec<_> = EventStatus::ALL
            .into_iter()
            .map(|status| {
                let row = rows.iter().find(|r| r.status == status);
                EventStatusDistribution {
                    event_status: status,
                    total_events: row.map_or(0, |r| r.event_count),
                    total_capacity: row.map_or(0, |r| r.total_capacity),
                    tickets_booked: row.map_or(0, |r| r.tickets_booked),
                }
            })
            .collect();

        Self {
            total_events: event_status_distribution.iter().map(|d| d.total_events).sum(),
            event_status_distribution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketStatusDistribution {
    pub ticket_status: TicketStatus,
    pub total_tickets: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketReport {
    pub total_tickets: i64,
    pub total_revenue: Decimal,
    pub ticket_status_distribution: Vec<TicketStatusDistribution>,
}

impl TicketReport {
    pub fn from_rollups(rows: &[TicketStatusRollup]) -> Self {
        let ticket_status_distribution: Vec<_> = TicketStatus::ALL
            .into_iter()
            .map(|status| {
                let row = rows.iter().find(|r| r.status == status);
                TicketStatusDistribution {
                    ticket_status: status,
                    total_tickets: row.map_or(0, |r| r.total_tickets),
                    total_revenue: row.map_or(Decimal::ZERO, |r| r.total_revenue),
                }
            })
            .collect();

        Self {
            total_tickets: ticket_status_distribution.iter().map(|d| d.total_tickets).sum(),
            total_revenue: ticket_status_distribution.iter().map(|d| d.total_revenue).sum(),
            ticket_status_distribution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TicketsSoldPerEvent {
    pub event_id: Uuid,
    pub event_name: String,
    pub total_tickets: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRoleDistribution {
    pub role: Role,
    pub total_users: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserReport {
    pub total_users: i64,
    pub user_role_distribution: Vec<UserRoleDistribution>,
}

impl UserReport {
    pub fn from_rollups(rows: &[RoleRollup]) -> Self {
        let user_role_distribution: Vec<_> = Role::ALL
            .into_iter()
            .map(|role| UserRoleDistribution {
                role,
                total_users: rows
                    .iter()
                    .find(|r| r.role == role)
                    .map_or(0, |r| r.total_users),
            })
            .collect();

        Self {
            total_users: user_role_distribution.iter().map(|d| d.total_users).sum(),
            user_role_distribution,
        }
    }
}
