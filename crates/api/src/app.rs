use std::sync::Arc;

use axum::extract::Extension;
use axum::routing::{get, post};
use axum::Router;

use streetfix_infra::IssueRepository;
use streetfix_summary::{
    IssueStore, SummaryBackend, SummaryConfig, SummaryDispatcher, SummaryGenerator,
};

pub mod errors;
pub mod routes;

/// Shared services injected into request handlers.
///
/// The store serves double duty: the handlers use its repository surface,
/// the summary generator its transactional row-locking surface.
pub struct AppServices<R, B> {
    pub issues: R,
    pub dispatcher: SummaryDispatcher<R, B>,
}

impl<R, B> AppServices<R, B>
where
    R: IssueRepository + IssueStore + Clone + 'static,
    B: SummaryBackend + 'static,
{
    pub fn new(issues: R, backend: B, config: SummaryConfig) -> Self {
        let generator = Arc::new(SummaryGenerator::new(issues.clone(), backend, config));
        Self {
            issues,
            dispatcher: SummaryDispatcher::new(generator),
        }
    }
}

/// Build the application router.
pub fn build_app<R, B>(services: Arc<AppServices<R, B>>) -> Router
where
    R: IssueRepository + IssueStore + 'static,
    B: SummaryBackend + 'static,
{
    Router::new()
        .route("/issues", post(routes::issues::create_issue::<R, B>))
        .route(
            "/issues/:id",
            get(routes::issues::get_issue::<R, B>).delete(routes::issues::delete_issue::<R, B>),
        )
        .layer(Extension(services))
}
