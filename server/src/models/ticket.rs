use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::TIMESTAMP_FORMAT;
use crate::booking::BookingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    Purchased,
    Cancelled,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 2] = [TicketStatus::Purchased, TicketStatus::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Purchased => "Purchased",
            TicketStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| BookingError::validation(format!("unknown ticket status '{}'", s)))
    }
}

super::text_column!(TicketStatus);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn purchased(event_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            status: TicketStatus::Purchased,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTicketRequest {
    pub event_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTicketRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: TicketStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Ticket> for TicketView {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            event_id: ticket.event_id,
            user_id: ticket.user_id,
            status: ticket.status,
            created_at: ticket.created_at.format(TIMESTAMP_FORMAT).to_string(),
            updated_at: ticket.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}
