//! `streetfix-issues` — the reported-issue record.
//!
//! Plain data: the `Issue` record as the store persists it, the category and
//! status vocabularies, and validated creation input. Triage workflows and
//! presentation live elsewhere.

pub mod issue;

pub use issue::{Issue, IssueCategory, IssueStatus, NewIssue};
