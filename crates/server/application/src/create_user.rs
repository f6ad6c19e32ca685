//! User creation use case.
//!
//! Reference producer for the outbox: the user row and its `user_created`
//! event record commit in the same transaction or not at all.

use crate::appender::OutboxAppender;
use eventline_domain::outbox::{EventContext, EventRecordDraft, OutboxError};
use eventline_domain::users::{NewUser, User, UserError, UserRepository};
use sqlx::postgres::PgPool;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    #[error("user with email {0} already exists")]
    DuplicateEmail(String),

    #[error(transparent)]
    User(UserError),

    #[error(transparent)]
    Outbox(#[from] OutboxError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<UserError> for CreateUserError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::DuplicateEmail(email) => CreateUserError::DuplicateEmail(email),
            other => CreateUserError::User(other),
        }
    }
}

pub struct CreateUser {
    pool: PgPool,
    users: Arc<dyn UserRepository>,
    appender: Arc<OutboxAppender>,
}

impl CreateUser {
    pub fn new(pool: PgPool, users: Arc<dyn UserRepository>, appender: Arc<OutboxAppender>) -> Self {
        Self {
            pool,
            users,
            appender,
        }
    }

    pub async fn execute(&self, request: CreateUserRequest) -> Result<User, CreateUserError> {
        let mut tx = self.pool.begin().await?;

        let new_user = NewUser {
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
        };
        let user = self.users.insert_with_tx(&mut tx, &new_user).await?;

        // Null is not a representable context value, so absent names are
        // recorded as empty strings.
        let context = EventContext::new()
            .with("email", user.email.as_str())
            .with("first_name", user.first_name.clone().unwrap_or_default())
            .with("last_name", user.last_name.clone().unwrap_or_default());
        self.appender
            .append(&mut tx, EventRecordDraft::new("user_created", context))
            .await?;

        tx.commit().await?;

        info!(user_id = %user.id, email = %user.email, "✅ User created");
        Ok(user)
    }
}
