//! User storage.

use crate::models::User;
use crate::repositories::RepositoryError;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Emails are unique, compared case-insensitively.
    async fn insert(&self, user: User) -> Result<User, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Option<User>;

    async fn find_by_provider_uid(&self, provider_uid: &str) -> Option<User>;
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(RepositoryError::Conflict(
                "User is already registered".to_string(),
            ));
        }

        users.insert(user.id, user.clone());
        tracing::debug!(target: "venue.repositories.users", user_id = %user.id, "User stored");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    async fn find_by_provider_uid(&self, provider_uid: &str) -> Option<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.provider_uid == provider_uid)
            .cloned()
    }
}
