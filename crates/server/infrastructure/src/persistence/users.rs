//! PostgreSQL user repository.

use eventline_domain::users::{NewUser, User, UserError, UserRepository};
use sqlx::postgres::PgPool;
use sqlx::{FromRow, PgTransaction};
use uuid::Uuid;

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
        }
    }
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations for the users table.
    pub async fn run_migrations(&self) -> Result<(), UserError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                email VARCHAR(255) NOT NULL UNIQUE,
                first_name VARCHAR(255),
                last_name VARCHAR(255),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert_with_tx(
        &self,
        tx: &mut PgTransaction<'_>,
        user: &NewUser,
    ) -> Result<User, UserError> {
        let row: UserRow = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, first_name, last_name)
            VALUES ($1, $2, $3)
            RETURNING id, email, first_name, last_name, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                UserError::DuplicateEmail(user.email.clone())
            }
            _ => UserError::Database(e),
        })?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let row: Option<UserRow> = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, first_name, last_name, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}
