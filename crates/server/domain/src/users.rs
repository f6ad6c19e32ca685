//! User producer domain.
//!
//! The user-registration use case is the reference producer for the outbox:
//! creating a user and appending its `user_created` event happen in one
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgTransaction;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self.email.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user inside the caller's transaction. Fails with
    /// [`UserError::DuplicateEmail`] on a unique-constraint violation.
    async fn insert_with_tx(
        &self,
        tx: &mut PgTransaction<'_>,
        user: &NewUser,
    ) -> Result<User, UserError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;
}
