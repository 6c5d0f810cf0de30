//! Account registration and sign-in.

use crate::errors::ServiceError;
use crate::models::User;
use crate::repositories::UserRepository;
use crate::services::identity::{IdentityProvider, SignInResponse};
use chrono::Utc;
use common::secret::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub struct UserService {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(identity: Arc<dyn IdentityProvider>, users: Arc<dyn UserRepository>) -> Self {
        Self { identity, users }
    }

    /// Create the account at the provider, then record it locally.
    #[instrument(skip_all, name = "venue.services.users.register")]
    pub async fn register(&self, email: &str, password: &SecretString) -> Result<User, ServiceError> {
        let email = email.trim();
        validate_email(email)?;
        validate_password(password)?;

        if self.users.find_by_email(email).await.is_some() {
            return Err(ServiceError::Conflict("User is already registered".to_string()));
        }

        let account = self.identity.sign_up(email, password).await?;

        let now = Utc::now();
        let user = self
            .users
            .insert(User {
                id: Uuid::new_v4(),
                provider_uid: account.local_id,
                email: email.to_string(),
                created_on: now,
                updated_on: now,
            })
            .await?;

        tracing::info!(target: "venue.services.users", user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Exchange email and password for provider credentials.
    #[instrument(skip_all, name = "venue.services.users.sign_in")]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignInResponse, ServiceError> {
        let email = email.trim();
        if email.is_empty() || password.expose_secret().is_empty() {
            return Err(ServiceError::BadRequest(
                "Email and password are required".to_string(),
            ));
        }

        Ok(self.identity.sign_in_with_password(email, password).await?)
    }
}

/// A deliberately loose shape check; the provider does the real validation.
pub fn validate_email(email: &str) -> Result<(), ServiceError> {
    let invalid = || ServiceError::BadRequest("Invalid email address".to_string());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let domain_ok = !domain.contains('@')
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.');

    if local.is_empty() || !domain_ok {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_password(password: &SecretString) -> Result<(), ServiceError> {
    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
