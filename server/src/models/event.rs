use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{DateWindow, DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::booking::BookingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    Active,
    Ongoing,
    Completed,
    Cancelled,
    SoldOut,
}

impl EventStatus {
    /// Every status, in report order.
    pub const ALL: [EventStatus; 5] = [
        EventStatus::Active,
        EventStatus::Ongoing,
        EventStatus::Completed,
        EventStatus::Cancelled,
        EventStatus::SoldOut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "Active",
            EventStatus::Ongoing => "Ongoing",
            EventStatus::Completed => "Completed",
            EventStatus::Cancelled => "Cancelled",
            EventStatus::SoldOut => "SoldOut",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Cancelled)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| BookingError::validation(format!("unknown event status '{}'", s)))
    }
}

super::text_column!(EventStatus);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub location: String,
    pub date: NaiveDate,
    pub category: String,
    pub capacity: i32,
    pub price: Decimal,
    pub available_tickets: i32,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Opens a new event with its full capacity on sale.
    ///
    /// An event without seats starts out sold out.
    pub fn open(request: CreateEventRequest, now: DateTime<Utc>) -> Self {
        let status = if request.capacity == 0 {
            EventStatus::SoldOut
        } else {
            EventStatus::Active
        };

        Self {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            location: request.location,
            date: request.date,
            category: request.category,
            capacity: request.capacity,
            price: request.price,
            available_tickets: request.capacity,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Tickets handed out so far.
    pub fn tickets_booked(&self) -> i32 {
        self.capacity - self.available_tickets
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub description: String,
    pub location: String,
    pub date: NaiveDate,
    pub category: String,
    pub capacity: i32,
    pub price: Decimal,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<(), BookingError> {
        for (field, value) in [
            ("name", &self.name),
            ("description", &self.description),
            ("location", &self.location),
            ("category", &self.category),
        ] {
            if value.trim().is_empty() {
                return Err(BookingError::validation(format!("{} is required", field)));
            }
        }
        if self.capacity < 0 {
            return Err(BookingError::validation("capacity must not be negative"));
        }
        if self.price.is_sign_negative() {
            return Err(BookingError::validation("price must not be negative"));
        }
        Ok(())
    }
}

/// Descriptive edits. Capacity, seat counter and status are not editable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
}

impl UpdateEventRequest {
    pub fn validate(&self) -> Result<(), BookingError> {
        for (field, value) in [
            ("name", &self.name),
            ("description", &self.description),
            ("location", &self.location),
            ("category", &self.category),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(BookingError::validation(format!("{} must not be empty", field)));
            }
        }
        if self.price.is_some_and(|p| p.is_sign_negative()) {
            return Err(BookingError::validation("price must not be negative"));
        }
        Ok(())
    }

    pub fn apply(self, event: &mut Event, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            event.name = name;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(location) = self.location {
            event.location = location;
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(category) = self.category {
            event.category = category;
        }
        if let Some(price) = self.price {
            event.price = price;
        }
        event.updated_at = now;
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEventStatusRequest {
    pub status: EventStatus,
}

/// Criteria for event search. Unset fields do not filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub query: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub category: Option<String>,
    pub status: Option<EventStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl EventFilter {
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start_date, self.end_date)
    }

    pub fn validate(&self) -> Result<(), BookingError> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(BookingError::validation(
                    "min_price must be less than or equal to max_price",
                ));
            }
        }
        self.window().validate()
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            let needle = query.to_lowercase();
            let hit = [&event.name, &event.description, &event.location]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| event.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| event.price > max) {
            return false;
        }
        if let Some(category) = self.category.as_deref() {
            if !event.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if self.status.is_some_and(|status| event.status != status) {
            return false;
        }
        self.window().contains_date(event.date)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub location: String,
    pub date: String,
    pub category: String,
    pub capacity: i32,
    pub price: Decimal,
    pub status: EventStatus,
    pub available_tickets: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            name: event.name,
            description: event.description,
            location: event.location,
            date: event.date.format(DATE_FORMAT).to_string(),
            category: event.category,
            capacity: event.capacity,
            price: event.price,
            status: event.status,
            available_tickets: event.available_tickets,
            created_at: event.created_at.format(TIMESTAMP_FORMAT).to_string(),
            updated_at: event.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}
