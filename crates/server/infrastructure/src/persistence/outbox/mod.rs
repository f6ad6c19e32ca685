//! Postgres outbox store.

pub mod postgres;

pub use postgres::PostgresOutboxRepository;
