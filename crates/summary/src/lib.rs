//! `streetfix-summary`
//!
//! **Responsibility:** generating and persisting the AI summary of an
//! issue's description, off the request path.
//!
//! The subsystem owns three things and nothing else:
//! - the generation algorithm (`SummaryGenerator`): lock the record, decide
//!   whether work is needed, call the summarisation backend, persist;
//! - the detached execution model (`SummaryDispatcher`): fire-and-forget to
//!   callers, observable handles for operators;
//! - the seams it consumes: a transactional issue store and a chat-style
//!   summarisation backend, both as traits with in-process implementations
//!   for tests and development.
//!
//! Failures never leave the subsystem. A failed generation leaves
//! `ai_summary` empty, which is itself the signal that a later trigger may
//! try again.

pub mod backend;
pub mod dispatcher;
pub mod generator;
pub mod prompt;
pub mod store;

pub use backend::{
    BackendError, ChatCompletion, ChatMessage, ChatRequest, ChatRole, FixedResponseBackend,
    SummaryBackend,
};
pub use dispatcher::SummaryDispatcher;
pub use generator::{SummaryConfig, SummaryError, SummaryGenerator, SummaryOutcome};
pub use store::{InMemoryIssueStore, IssueStore, IssueTransaction, StoreError};
