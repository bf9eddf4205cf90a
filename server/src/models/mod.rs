pub mod event;
pub mod report;
pub mod ticket;
pub mod user;

pub use event::{
    ChangeEventStatusRequest, CreateEventRequest, Event, EventFilter, EventStatus, EventView,
    UpdateEventRequest,
};
pub use report::{
    DateWindow, EventReport, EventStatusDistribution, EventStatusRollup, RoleRollup,
    TicketReport, TicketStatusDistribution, TicketStatusRollup, TicketsSoldPerEvent, UserReport,
    UserRoleDistribution,
};
pub use ticket::{CreateTicketRequest, Ticket, TicketStatus, TicketView, UpdateTicketRequest};
pub use user::{Caller, CreateUserRequest, Role, UpdateUserRequest, User, UserView};

/// Format used for every timestamp handed back to API callers.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of calendar dates on the wire.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Stores a closed string vocabulary in a Postgres `TEXT` column.
///
/// The type must provide `as_str()` and a `FromStr` impl whose error is a
/// `std::error::Error`.
macro_rules! text_column {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(raw.parse::<$ty>()?)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub(crate) use text_column;
