//! Detached execution of summary generation.

use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;
use tracing::debug;

use streetfix_core::IssueId;

use crate::backend::SummaryBackend;
use crate::generator::SummaryGenerator;
use crate::store::IssueStore;

/// Fires the generator off the critical path of the triggering request.
///
/// `dispatch` returns immediately and never surfaces the outcome to its
/// caller; results are observable only through logs and the store. Unlike a
/// bare spawn-and-forget, the task handles are retained in a [`JoinSet`] so
/// operators can count, await or abort in-flight work without changing the
/// no-wait contract on the trigger side.
///
/// This is an in-process, best-effort mechanism, not a durable queue:
/// dispatches do not survive process termination. Callers must dispatch
/// only after the issue record is durably committed, or the spawned run may
/// not see the row.
pub struct SummaryDispatcher<S, B> {
    generator: Arc<SummaryGenerator<S, B>>,
    tasks: Mutex<JoinSet<()>>,
}

impl<S, B> SummaryDispatcher<S, B>
where
    S: IssueStore + 'static,
    B: SummaryBackend + 'static,
{
    pub fn new(generator: Arc<SummaryGenerator<S, B>>) -> Self {
        Self {
            generator,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Schedule one generation run for `issue_id` and return immediately.
    ///
    /// Must be called from within a tokio runtime. There is no ordering
    /// across distinct issue ids and no completion-time guarantee; per-id
    /// ordering comes from the store's row lock, not from here.
    pub fn dispatch(&self, issue_id: IssueId) {
        let generator = Arc::clone(&self.generator);
        let mut tasks = self.tasks.lock().unwrap();

        // Reap handles of units that already finished so the set does not
        // grow with the lifetime of the process.
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            generator.generate(issue_id).await;
        });
        debug!(issue_id = %issue_id, in_flight = tasks.len(), "dispatched summary generation");
    }

    /// Number of background units not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Await completion of everything currently in flight.
    ///
    /// Shutdown/test hook; triggers never call this.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap());
        while tasks.join_next().await.is_some() {}
    }

    /// Abort everything currently in flight.
    pub fn abort_all(&self) {
        self.tasks.lock().unwrap().abort_all();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::FixedResponseBackend;
    use crate::generator::SummaryConfig;
    use crate::store::InMemoryIssueStore;
    use streetfix_issues::{Issue, IssueCategory, NewIssue};

    fn dispatcher(
        store: &InMemoryIssueStore,
        backend: &Arc<FixedResponseBackend>,
    ) -> SummaryDispatcher<InMemoryIssueStore, Arc<FixedResponseBackend>> {
        SummaryDispatcher::new(Arc::new(SummaryGenerator::new(
            store.clone(),
            Arc::clone(backend),
            SummaryConfig::default(),
        )))
    }

    fn seeded(store: &InMemoryIssueStore) -> streetfix_core::IssueId {
        store.insert(Issue::new(
            NewIssue::new(
                "Fly-tipping behind the depot",
                "Mattresses dumped behind the bus depot.",
                IssueCategory::FlyTipping,
                "a@b.com",
            )
            .unwrap(),
        ))
    }

    #[tokio::test]
    async fn dispatch_runs_the_generator_exactly_once() {
        let store = InMemoryIssueStore::new();
        let backend = Arc::new(FixedResponseBackend::replying("Dumped mattresses reported."));
        let dispatcher = dispatcher(&store, &backend);
        let id = seeded(&store);

        dispatcher.dispatch(id);
        dispatcher.drain().await;

        assert_eq!(backend.calls(), 1);
        assert_eq!(
            store.get(id).unwrap().ai_summary,
            "Dumped mattresses reported."
        );
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn dispatch_does_not_block_on_a_slow_unit() {
        let store = InMemoryIssueStore::new();
        let backend = Arc::new(FixedResponseBackend::replying("ok"));
        let dispatcher = dispatcher(&store, &backend);
        let id = seeded(&store);

        // Hold the row lock so the dispatched unit cannot finish.
        let mut blocker = store.begin().await.unwrap();
        blocker.lock(id).await.unwrap();

        dispatcher.dispatch(id);
        assert_eq!(dispatcher.in_flight(), 1);

        // The dispatching side is still free to run; release and drain.
        blocker.commit().await.unwrap();
        dispatcher.drain().await;
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn failures_stay_inside_the_dispatched_unit() {
        let store = InMemoryIssueStore::new();
        let backend = Arc::new(FixedResponseBackend::failing(
            crate::backend::BackendError::Timeout,
        ));
        let dispatcher = dispatcher(&store, &backend);
        let id = seeded(&store);

        dispatcher.dispatch(id);
        dispatcher.drain().await;

        // The record is untouched and nothing panicked or propagated.
        assert_eq!(store.get(id).unwrap().ai_summary, "");
    }

    #[tokio::test]
    async fn independent_dispatches_all_complete() {
        let store = InMemoryIssueStore::new();
        let backend = Arc::new(FixedResponseBackend::replying("summary"));
        let dispatcher = dispatcher(&store, &backend);

        let ids: Vec<_> = (0..5).map(|_| seeded(&store)).collect();
        for id in &ids {
            dispatcher.dispatch(*id);
        }
        dispatcher.drain().await;

        assert_eq!(backend.calls(), 5);
        for id in ids {
            assert_eq!(store.get(id).unwrap().ai_summary, "summary");
        }
    }

    #[tokio::test]
    async fn drain_waits_for_in_flight_units() {
        let store = InMemoryIssueStore::new();
        let backend = Arc::new(FixedResponseBackend::replying("late"));
        let dispatcher = Arc::new(dispatcher(&store, &backend));
        let id = seeded(&store);

        let mut blocker = store.begin().await.unwrap();
        blocker.lock(id).await.unwrap();
        dispatcher.dispatch(id);

        let waiter = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.drain().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        blocker.commit().await.unwrap();
        waiter.await.unwrap();
        assert_eq!(store.get(id).unwrap().ai_summary, "late");
    }
}
