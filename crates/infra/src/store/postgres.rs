//! Postgres-backed issue store.
//!
//! Row locking uses `SELECT ... FOR UPDATE` inside a per-operation
//! transaction, which is what serializes concurrent summary generation for
//! one issue across processes. The summary write path touches the
//! `ai_summary` column (plus `updated_at` bookkeeping) and nothing else.
//!
//! ## Error mapping
//!
//! | sqlx error            | StoreError    |
//! |-----------------------|---------------|
//! | `RowNotFound`         | `NotFound`    |
//! | `PoolTimedOut` / `Io` | `Unavailable` |
//! | anything else         | `Query`       |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use streetfix_core::{IssueId, StaffId};
use streetfix_issues::{Issue, IssueCategory, IssueStatus, NewIssue};
use streetfix_summary::{IssueStore, IssueTransaction, StoreError};

use super::IssueRepository;

const ISSUE_COLUMNS: &str = "id, title, description, ai_summary, category, email, \
                             assigned_to, status, created_at, updated_at";

/// Issue storage backed by a PostgreSQL pool.
///
/// Thread-safe: the sqlx pool is `Send + Sync` and every operation runs on
/// its own connection or transaction.
#[derive(Debug, Clone)]
pub struct PostgresIssueStore {
    pool: Arc<PgPool>,
}

impl PostgresIssueStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Apply embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&*self.pool).await
    }
}

#[derive(Debug, FromRow)]
struct IssueRow {
    id: Uuid,
    title: String,
    description: String,
    ai_summary: String,
    category: String,
    email: String,
    assigned_to: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IssueRow> for Issue {
    type Error = StoreError;

    fn try_from(row: IssueRow) -> Result<Self, Self::Error> {
        let category = IssueCategory::from_code(&row.category)
            .ok_or_else(|| StoreError::Query(format!("unknown category code {:?}", row.category)))?;
        let status = IssueStatus::from_code(&row.status)
            .ok_or_else(|| StoreError::Query(format!("unknown status code {:?}", row.status)))?;

        Ok(Issue {
            id: IssueId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            ai_summary: row.ai_summary,
            category,
            email: row.email,
            assigned_to: row.assigned_to.map(StaffId::from_uuid),
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::Unavailable(err.to_string()),
        other => StoreError::Query(other.to_string()),
    }
}

#[async_trait]
impl IssueRepository for PostgresIssueStore {
    async fn insert(&self, input: NewIssue) -> Result<Issue, StoreError> {
        let issue = Issue::new(input);
        sqlx::query(
            "INSERT INTO issues \
             (id, title, description, ai_summary, category, email, assigned_to, status, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(issue.id.as_uuid())
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(&issue.ai_summary)
        .bind(issue.category.code())
        .bind(&issue.email)
        .bind(issue.assigned_to.map(|s| *s.as_uuid()))
        .bind(issue.status.code())
        .bind(issue.created_at)
        .bind(issue.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(issue)
    }

    async fn get(&self, issue_id: IssueId) -> Result<Option<Issue>, StoreError> {
        let row: Option<IssueRow> =
            sqlx::query_as(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"))
                .bind(issue_id.as_uuid())
                .fetch_optional(&*self.pool)
                .await
                .map_err(map_sqlx)?;

        row.map(Issue::try_from).transpose()
    }

    async fn delete(&self, issue_id: IssueId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM issues WHERE id = $1")
            .bind(issue_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IssueStore for PostgresIssueStore {
    async fn begin(&self) -> Result<Box<dyn IssueTransaction>, StoreError> {
        let tx = self.pool.begin().await.map_err(map_sqlx)?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl IssueTransaction for PostgresTransaction {
    async fn lock(&mut self, issue_id: IssueId) -> Result<Issue, StoreError> {
        let row: Option<IssueRow> = sqlx::query_as(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1 FOR UPDATE"
        ))
        .bind(issue_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn store_summary(&mut self, issue_id: IssueId, summary: &str) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE issues SET ai_summary = $2, updated_at = NOW() WHERE id = $1")
                .bind(issue_id.as_uuid())
                .bind(summary)
                .execute(&mut *self.tx)
                .await
                .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx)
    }
}
