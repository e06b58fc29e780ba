use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use streetfix_core::IssueId;
use streetfix_infra::IssueRepository;
use streetfix_issues::{IssueCategory, NewIssue};
use streetfix_summary::{IssueStore, SummaryBackend};

use crate::app::{errors, AppServices};

#[derive(Debug, Deserialize)]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: IssueCategory,
    pub email: String,
}

pub async fn create_issue<R, B>(
    Extension(services): Extension<Arc<AppServices<R, B>>>,
    Json(body): Json<CreateIssueRequest>,
) -> axum::response::Response
where
    R: IssueRepository + IssueStore + 'static,
    B: SummaryBackend + 'static,
{
    let input = match NewIssue::new(body.title, body.description, body.category, body.email) {
        Ok(input) => input,
        Err(e) => {
            return errors::json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                e.to_string(),
            );
        }
    };

    let issue = match services.issues.insert(input).await {
        Ok(issue) => issue,
        Err(e) => return errors::store_error_to_response(e),
    };

    // The record is committed at this point; only now is it safe to hand
    // the id to the background generator.
    services.dispatcher.dispatch(issue.id);

    (StatusCode::CREATED, Json(issue)).into_response()
}

pub async fn get_issue<R, B>(
    Extension(services): Extension<Arc<AppServices<R, B>>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    R: IssueRepository + IssueStore + 'static,
    B: SummaryBackend + 'static,
{
    let issue_id: IssueId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid issue id"),
    };

    match services.issues.get(issue_id).await {
        Ok(Some(issue)) => (StatusCode::OK, Json(issue)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "issue not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_issue<R, B>(
    Extension(services): Extension<Arc<AppServices<R, B>>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    R: IssueRepository + IssueStore + 'static,
    B: SummaryBackend + 'static,
{
    let issue_id: IssueId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid issue id"),
    };

    match services.issues.delete(issue_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "issue not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}
