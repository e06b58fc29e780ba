//! Infrastructure layer: database-backed issue storage and external
//! service clients.

pub mod external;
pub mod store;

pub use external::{OpenAiBackend, OpenAiConfig};
pub use store::{IssueRepository, PostgresIssueStore};
