//! Transactional Outbox Pattern abstractions.
//!
//! Event records are appended atomically with the business change that
//! produced them and relayed to the analytical event log asynchronously,
//! which avoids a distributed transaction across the two stores.

pub mod context;
pub mod model;
pub mod repository;

pub use context::{ContextValue, EventContext, TransformError};
pub use model::{EventRecordDraft, EventRecordInsert, EventRecordView, OutboxError, OutboxStats};
pub use repository::OutboxRepository;
