//! Postgres persistence adapters.

pub mod outbox;
pub mod users;

pub use outbox::PostgresOutboxRepository;
pub use users::PostgresUserRepository;
