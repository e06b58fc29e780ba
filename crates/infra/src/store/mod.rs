//! Issue storage adapters.
//!
//! [`IssueRepository`] is the collaborator-facing surface the HTTP layer
//! needs (create, fetch, delete). The summary subsystem's narrower
//! transactional seam (`streetfix_summary::IssueStore`) is implemented by
//! the same concrete stores.

pub mod postgres;

use async_trait::async_trait;

use streetfix_core::IssueId;
use streetfix_issues::{Issue, NewIssue};
use streetfix_summary::{InMemoryIssueStore, StoreError};

pub use postgres::PostgresIssueStore;

/// Record-level CRUD over issue storage.
///
/// Deliberately without a listing operation; browsing/pagination is not a
/// surface of this service.
#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// Persist a new record. On return the record is durably committed and
    /// safe to dispatch summarisation for.
    async fn insert(&self, input: NewIssue) -> Result<Issue, StoreError>;

    /// Fetch a committed record.
    async fn get(&self, issue_id: IssueId) -> Result<Option<Issue>, StoreError>;

    /// Delete a record. Returns whether it existed.
    async fn delete(&self, issue_id: IssueId) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S> IssueRepository for std::sync::Arc<S>
where
    S: IssueRepository + ?Sized,
{
    async fn insert(&self, input: NewIssue) -> Result<Issue, StoreError> {
        (**self).insert(input).await
    }

    async fn get(&self, issue_id: IssueId) -> Result<Option<Issue>, StoreError> {
        (**self).get(issue_id).await
    }

    async fn delete(&self, issue_id: IssueId) -> Result<bool, StoreError> {
        (**self).delete(issue_id).await
    }
}

#[async_trait]
impl IssueRepository for InMemoryIssueStore {
    async fn insert(&self, input: NewIssue) -> Result<Issue, StoreError> {
        let issue = Issue::new(input);
        InMemoryIssueStore::insert(self, issue.clone());
        Ok(issue)
    }

    async fn get(&self, issue_id: IssueId) -> Result<Option<Issue>, StoreError> {
        Ok(InMemoryIssueStore::get(self, issue_id))
    }

    async fn delete(&self, issue_id: IssueId) -> Result<bool, StoreError> {
        Ok(InMemoryIssueStore::remove(self, issue_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streetfix_issues::IssueCategory;

    #[tokio::test]
    async fn in_memory_repository_round_trips() {
        let store = InMemoryIssueStore::new();
        let input =
            NewIssue::new("Graffiti on underpass", "Tags on the A40 underpass.", IssueCategory::Graffiti, "a@b.com")
                .unwrap();

        let created = IssueRepository::insert(&store, input).await.unwrap();
        let fetched = IssueRepository::get(&store, created.id).await.unwrap();
        assert_eq!(fetched, Some(created.clone()));

        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.delete(created.id).await.unwrap());
        assert_eq!(IssueRepository::get(&store, created.id).await.unwrap(), None);
    }
}
