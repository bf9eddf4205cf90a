//! The inventory and booking core. Nothing in here knows about HTTP.

pub mod error;
pub mod events;
pub mod inventory;
pub mod reports;
pub mod service;
pub mod status;
pub mod users;

pub use error::{BookingError, BookingResult};
pub use events::EventService;
pub use inventory::InventoryController;
pub use reports::ReportAggregator;
pub use service::BookingService;
pub use status::{CancelledEvent, StatusMachine};
pub use users::UserService;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use crate::models::{CreateEventRequest, CreateUserRequest, Event, Role, User};
    use crate::store::{EventStore, MemoryStore, UserStore};

    pub fn event(name: &str, capacity: i32, price: i64) -> Event {
        Event::open(
            CreateEventRequest {
                name: name.to_string(),
                description: format!("{} description", name),
                location: "Main hall".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
                category: "concert".to_string(),
                capacity,
                price: Decimal::from(price),
            },
            Utc::now(),
        )
    }

    pub async fn seed_event(store: &MemoryStore, name: &str, capacity: i32, price: i64) -> Event {
        let event = event(name, capacity, price);
        store.insert_event(&event).await.unwrap();
        event
    }

    pub async fn seed_user(store: &MemoryStore) -> User {
        let user = CreateUserRequest {
            name: "Guest".to_string(),
            email: format!("{}@example.com", uuid::Uuid::new_v4()),
            role: Role::User,
        }
        .into_user(Utc::now());
        store.insert_user(&user).await.unwrap();
        user
    }
}
