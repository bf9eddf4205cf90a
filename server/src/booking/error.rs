use thiserror::Error;
use uuid::Uuid;

/// Closed set of failures the booking core reports.
///
/// The HTTP layer maps each kind onto a stable status code; callers never
/// need the store's own error text.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{entity} with id '{id}' was not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("event '{0}' has no tickets left")]
    OutOfStock(Uuid),

    #[error("event '{id}' cannot be booked while {status}")]
    EventNotBookable { id: Uuid, status: String },

    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("{0}")]
    DuplicateName(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("store failure")]
    StoreFailure(#[from] sqlx::Error),
}

impl BookingError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        BookingError::NotFound { entity, id }
    }

    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        BookingError::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        BookingError::ValidationFailed(message.into())
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
