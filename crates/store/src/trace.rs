use std::time::Instant;

use uuid::Uuid;

/// Unit-of-work boundary logging and metrics.
///
/// Owned by each unit of work. Logs `begin`, `commit` and `rollback`
/// explicitly, and logs from `Drop` if the unit ends without either.
pub(crate) struct UowTrace {
    id: Uuid,
    started: Instant,
    settled: bool,
}

impl UowTrace {
    pub(crate) fn begin(backend: &'static str) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(uow = %id, backend, "Unit of work started");
        Self {
            id,
            started: Instant::now(),
            settled: false,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn committed(&mut self) {
        self.settled = true;
        metrics::counter!("uow_commits_total").increment(1);
        tracing::debug!(
            uow = %self.id,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Unit of work committed"
        );
    }

    pub(crate) fn rolled_back(&mut self) {
        self.settled = true;
        metrics::counter!("uow_rollbacks_total").increment(1);
        tracing::debug!(
            uow = %self.id,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Unit of work rolled back"
        );
    }
}

impl Drop for UowTrace {
    fn drop(&mut self) {
        if !self.settled {
            metrics::counter!("uow_rollbacks_total").increment(1);
            tracing::debug!(uow = %self.id, "Unit of work dropped without commit; writes discarded");
        }
    }
}
