//! The issue-store seam consumed by the generator.
//!
//! The generator needs very little from persistence: begin a transaction,
//! lock-and-fetch one row, write one field, commit. The trait captures
//! exactly that; anything wider (creation, triage edits, deletion) belongs
//! to other parts of the application and must not pass through here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use streetfix_core::IssueId;
use streetfix_issues::Issue;

/// Storage failure surfaced to the generator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identifier does not resolve to a record (never existed, or
    /// deleted since dispatch).
    #[error("issue not found")]
    NotFound,

    /// Could not reach or keep a connection to the store.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected or failed the operation.
    #[error("store query failed: {0}")]
    Query(String),
}

/// One exclusive unit of work against a single issue row.
///
/// Locks are write-intent row locks: a second `lock` on the same id blocks
/// until this transaction commits or is dropped. Dropping a transaction
/// without `commit` discards its writes (rollback). Callers lock a single
/// row per transaction; locking more invites deadlock and nothing in this
/// subsystem needs it.
#[async_trait]
pub trait IssueTransaction: Send {
    /// Acquire the row lock for `issue_id` and fetch the current record.
    async fn lock(&mut self, issue_id: IssueId) -> Result<Issue, StoreError>;

    /// Stage a write of `ai_summary` (and only `ai_summary`) for
    /// `issue_id`. Takes effect at commit.
    async fn store_summary(&mut self, issue_id: IssueId, summary: &str) -> Result<(), StoreError>;

    /// Commit staged writes and release held locks.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Transactional, row-locking access to issue records.
#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn IssueTransaction>, StoreError>;
}

#[async_trait]
impl<S> IssueStore for Arc<S>
where
    S: IssueStore + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn IssueTransaction>, StoreError> {
        (**self).begin().await
    }
}

/// In-memory issue store for tests/dev.
///
/// Emulates row locking with one async mutex cell per issue id: a
/// transaction holds the cell's guard from `lock` until commit or drop, and
/// applies staged writes to the shared map only at commit.
#[derive(Debug, Default, Clone)]
pub struct InMemoryIssueStore {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    rows: Mutex<HashMap<IssueId, Issue>>,
    row_locks: Mutex<HashMap<IssueId, Arc<RowLock<()>>>>,
}

impl InMemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, returning its id. Tests use this to seed
    /// arbitrary states (e.g. a pre-existing summary).
    pub fn insert(&self, issue: Issue) -> IssueId {
        let id = issue.id;
        self.inner.rows.lock().unwrap().insert(id, issue);
        id
    }

    /// Committed snapshot of a record.
    pub fn get(&self, issue_id: IssueId) -> Option<Issue> {
        self.inner.rows.lock().unwrap().get(&issue_id).cloned()
    }

    /// Remove a record. Returns whether it existed.
    pub fn remove(&self, issue_id: IssueId) -> bool {
        self.inner.rows.lock().unwrap().remove(&issue_id).is_some()
    }

    fn lock_cell(&self, issue_id: IssueId) -> Arc<RowLock<()>> {
        let mut cells = self.inner.row_locks.lock().unwrap();
        Arc::clone(cells.entry(issue_id).or_default())
    }
}

#[async_trait]
impl IssueStore for InMemoryIssueStore {
    async fn begin(&self) -> Result<Box<dyn IssueTransaction>, StoreError> {
        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            guards: Vec::new(),
            staged: Vec::new(),
        }))
    }
}

struct InMemoryTransaction {
    store: InMemoryIssueStore,
    guards: Vec<OwnedMutexGuard<()>>,
    staged: Vec<(IssueId, String)>,
}

#[async_trait]
impl IssueTransaction for InMemoryTransaction {
    async fn lock(&mut self, issue_id: IssueId) -> Result<Issue, StoreError> {
        let guard = self.store.lock_cell(issue_id).lock_owned().await;
        self.guards.push(guard);

        // Fetch after acquiring the lock so a competing transaction's
        // committed writes are visible.
        self.store.get(issue_id).ok_or(StoreError::NotFound)
    }

    async fn store_summary(&mut self, issue_id: IssueId, summary: &str) -> Result<(), StoreError> {
        self.staged.push((issue_id, summary.to_string()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut rows = self.store.inner.rows.lock().unwrap();
        for (issue_id, summary) in &self.staged {
            let row = rows.get_mut(issue_id).ok_or(StoreError::NotFound)?;
            row.ai_summary = summary.clone();
            row.updated_at = Utc::now();
        }
        Ok(())
        // Guards drop here, releasing the row locks.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streetfix_issues::{IssueCategory, NewIssue};

    fn seeded(store: &InMemoryIssueStore, description: &str) -> IssueId {
        store.insert(Issue::new(
            NewIssue::new("t", description, IssueCategory::Other, "a@b.com").unwrap(),
        ))
    }

    #[tokio::test]
    async fn staged_write_is_visible_only_after_commit() {
        let store = InMemoryIssueStore::new();
        let id = seeded(&store, "desc");

        let mut tx = store.begin().await.unwrap();
        tx.lock(id).await.unwrap();
        tx.store_summary(id, "summary").await.unwrap();
        assert_eq!(store.get(id).unwrap().ai_summary, "");

        tx.commit().await.unwrap();
        assert_eq!(store.get(id).unwrap().ai_summary, "summary");
    }

    #[tokio::test]
    async fn dropped_transaction_discards_staged_writes() {
        let store = InMemoryIssueStore::new();
        let id = seeded(&store, "desc");

        {
            let mut tx = store.begin().await.unwrap();
            tx.lock(id).await.unwrap();
            tx.store_summary(id, "never lands").await.unwrap();
        }

        assert_eq!(store.get(id).unwrap().ai_summary, "");
    }

    #[tokio::test]
    async fn lock_blocks_second_transaction_until_commit() {
        let store = InMemoryIssueStore::new();
        let id = seeded(&store, "desc");

        let mut first = store.begin().await.unwrap();
        first.lock(id).await.unwrap();
        first.store_summary(id, "from first").await.unwrap();

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut tx = store.begin().await.unwrap();
                let seen = tx.lock(id).await.unwrap();
                tx.commit().await.unwrap();
                seen.ai_summary
            })
        };

        // The contender cannot proceed while the first lock is held.
        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        first.commit().await.unwrap();
        assert_eq!(contender.await.unwrap(), "from first");
    }

    #[tokio::test]
    async fn locking_a_missing_issue_reports_not_found() {
        let store = InMemoryIssueStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx.lock(IssueId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
