//! Domain layer for the eventline outbox relay.
//!
//! Holds the event record model, the repository and sink abstractions the
//! relay is built on, and the user producer domain. No I/O happens here;
//! implementations live in `eventline-infrastructure`.

pub mod outbox;
pub mod reporting;
pub mod sink;
pub mod users;

pub use outbox::{
    ContextValue, EventContext, EventRecordDraft, EventRecordInsert, EventRecordView, OutboxError,
    OutboxRepository, OutboxStats, TransformError,
};
pub use reporting::ErrorReporter;
pub use sink::{EventLogRow, EventLogSink, SinkError};
pub use users::{NewUser, User, UserError, UserRepository};
