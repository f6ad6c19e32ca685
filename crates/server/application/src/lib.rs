//! Application layer: use cases composing domain ports.

pub mod appender;
pub mod create_user;

pub use appender::OutboxAppender;
pub use create_user::{CreateUser, CreateUserError, CreateUserRequest};
