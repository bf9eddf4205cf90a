use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{BookingError, BookingResult};
use crate::models::{CreateUserRequest, UpdateUserRequest, User, UserView};
use crate::store::{Ledger, UserStore};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    ledger: Arc<dyn Ledger>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, ledger: Arc<dyn Ledger>) -> Self {
        Self { users, ledger }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> BookingResult<UserView> {
        request.validate()?;
        let user = request.into_user(Utc::now());
        if self.users.email_taken(&user.email, None).await? {
            return Err(duplicate_email(&user.email));
        }
        self.users.insert_user(&user).await?;

        info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user.into())
    }

    pub async fn get_user(&self, user_id: Uuid) -> BookingResult<UserView> {
        Ok(self.load(user_id).await?.into())
    }

    pub async fn list_users(&self) -> BookingResult<Vec<UserView>> {
        let users = self.users.list_users().await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> BookingResult<UserView> {
        request.validate()?;
        let mut user = self.load(user_id).await?;

        if let Some(email) = request.email() {
            if email != user.email && self.users.email_taken(&email, Some(user_id)).await? {
                return Err(duplicate_email(&email));
            }
        }

        request.apply(&mut user, Utc::now());
        if !self.users.update_user(&user).await? {
            return Err(BookingError::not_found("user", user_id));
        }

        info!(%user_id, role = %user.role, "User updated");
        Ok(user.into())
    }

    /// Removes a user who holds no live booking.
    ///
    /// A user with a Purchased ticket cannot be deleted; their cancelled
    /// tickets go with them. Seat counters are never touched.
    pub async fn delete_user(&self, user_id: Uuid) -> BookingResult<()> {
        let mut tx = self.ledger.begin().await?;
        if tx.lock_user(user_id).await?.is_none() {
            return Err(BookingError::not_found("user", user_id));
        }
        if tx.user_holds_purchased_tickets(user_id).await? {
            return Err(BookingError::invalid_transition(
                "user",
                "ticket holder",
                "Deleted",
            ));
        }
        tx.delete_user(user_id).await?;
        tx.commit().await?;

        info!(%user_id, "User deleted");
        Ok(())
    }

    async fn load(&self, user_id: Uuid) -> BookingResult<User> {
        self.users
            .find_user(user_id)
            .await?
            .ok_or_else(|| BookingError::not_found("user", user_id))
    }
}

fn duplicate_email(email: &str) -> BookingError {
    BookingError::DuplicateName(format!("email '{}' is already registered", email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{fixtures, InventoryController, StatusMachine};
    use crate::models::{EventStatus, Role, TicketStatus};
    use crate::store::{EventStore, MemoryStore, TicketStore};

    fn service(store: &Arc<MemoryStore>) -> UserService {
        UserService::new(store.clone(), store.clone())
    }

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: "Dewi".to_string(),
            email: email.to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_email_is_unique_regardless_of_case() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);

        let created = service.create_user(request("dewi@example.com")).await.unwrap();
        assert_eq!(service.get_user(created.id).await.unwrap().email, "dewi@example.com");

        let again = service.create_user(request("Dewi@Example.com")).await;
        assert!(matches!(again, Err(BookingError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_list_users_returns_everyone() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        service.create_user(request("a@example.com")).await.unwrap();
        service.create_user(request("b@example.com")).await.unwrap();

        assert_eq!(service.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_user_changes_only_given_fields() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let created = service.create_user(request("old@example.com")).await.unwrap();

        let updated = service
            .update_user(
                created.id,
                UpdateUserRequest {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.email, "old@example.com");
        assert_eq!(updated.name, "Dewi");
    }

    #[tokio::test]
    async fn test_update_user_rejects_taken_email() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        service.create_user(request("taken@example.com")).await.unwrap();
        let other = service.create_user(request("other@example.com")).await.unwrap();

        let result = service
            .update_user(
                other.id,
                UpdateUserRequest {
                    email: Some("Taken@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(BookingError::DuplicateName(_))));

        let missing = service
            .update_user(Uuid::new_v4(), UpdateUserRequest::default())
            .await;
        assert!(matches!(missing, Err(BookingError::NotFound { entity: "user", .. })));
    }

    #[tokio::test]
    async fn test_ticket_holder_cannot_be_deleted() {
        let store = Arc::new(MemoryStore::new());
        let event = fixtures::seed_event(&store, "Keep me", 3, 40).await;
        let user = fixtures::seed_user(&store).await;
        let ticket = InventoryController::new(store.clone())
            .reserve(event.id, user.id)
            .await
            .unwrap();

        let refused = service(&store).delete_user(user.id).await;
        assert!(matches!(
            refused,
            Err(BookingError::InvalidTransition { entity: "user", .. })
        ));
        assert!(store.find_user(user.id).await.unwrap().is_some());
        assert_eq!(
            store.find_ticket(ticket.id).await.unwrap().unwrap().status,
            TicketStatus::Purchased
        );
    }

    #[tokio::test]
    async fn test_delete_user_takes_cancelled_tickets_and_keeps_counters() {
        let store = Arc::new(MemoryStore::new());
        let event = fixtures::seed_event(&store, "Leaving", 3, 40).await;
        let user = fixtures::seed_user(&store).await;
        let ticket = InventoryController::new(store.clone())
            .reserve(event.id, user.id)
            .await
            .unwrap();
        StatusMachine::new(store.clone())
            .transition_ticket(ticket.id, TicketStatus::Cancelled)
            .await
            .unwrap();

        service(&store).delete_user(user.id).await.unwrap();

        assert!(store.find_user(user.id).await.unwrap().is_none());
        assert!(store.find_ticket(ticket.id).await.unwrap().is_none());
        let stored = store.find_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.available_tickets, 2);
        assert_eq!(stored.status, EventStatus::Active);

        let again = service(&store).delete_user(user.id).await;
        assert!(matches!(again, Err(BookingError::NotFound { .. })));
    }
}
