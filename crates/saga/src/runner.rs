//! Generic saga runner: ordered steps with forward and compensating actions.

use async_trait::async_trait;

use crate::error::{Result, SagaError, ServiceError};
use crate::state::SagaState;

/// One step of a saga.
///
/// `execute` commits its own unit of work. If it returns an error nothing was
/// committed and the step is not compensated. Once it returns `Ok`, the step
/// counts as completed and `compensate` runs if any later check or step
/// fails, including this step's own [`SagaStep::verify`].
#[async_trait]
pub trait SagaStep<C: Send>: Send + Sync {
    fn name(&self) -> &'static str;

    /// The forward action.
    async fn execute(&self, ctx: &mut C) -> Result<()>;

    /// Postcondition on the state `execute` left in `ctx`.
    fn verify(&self, _ctx: &C) -> Result<()> {
        Ok(())
    }

    /// Undoes the forward action. The default has nothing to undo.
    async fn compensate(&self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }
}

/// Runs steps in order; on the first failure, compensates the completed
/// steps in reverse and returns the failure.
pub struct SagaRunner<C: Send> {
    saga_type: &'static str,
    steps: Vec<Box<dyn SagaStep<C>>>,
}

impl<C: Send> SagaRunner<C> {
    pub fn new(saga_type: &'static str) -> Self {
        Self {
            saga_type,
            steps: Vec::new(),
        }
    }

    /// Appends a step.
    pub fn step(mut self, step: impl SagaStep<C> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn saga_type(&self) -> &'static str {
        self.saga_type
    }

    /// Runs every step against `ctx`.
    pub async fn run(&self, ctx: &mut C) -> std::result::Result<(), SagaError> {
        let mut progress = Progress::new(self.saga_type);
        progress.advance(SagaState::Running);

        let mut completed: Vec<&dyn SagaStep<C>> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let name = step.name();
            tracing::info!(saga_type = self.saga_type, step = name, "saga step started");

            let outcome = match step.execute(ctx).await {
                Ok(()) => {
                    completed.push(step.as_ref());
                    step.verify(ctx)
                }
                Err(e) => Err(e),
            };

            if let Err(cause) = outcome {
                tracing::warn!(saga_type = self.saga_type, step = name, error = %cause, "saga step failed");
                metrics::counter!("saga_failed_total", "step" => name).increment(1);
                progress.advance(SagaState::Compensating);
                return self.unwind(ctx, &completed, name, cause, &mut progress).await;
            }

            tracing::info!(saga_type = self.saga_type, step = name, "saga step completed");
        }

        progress.advance(SagaState::Completed);
        Ok(())
    }

    async fn unwind(
        &self,
        ctx: &mut C,
        completed: &[&dyn SagaStep<C>],
        failed_step: &'static str,
        cause: ServiceError,
        progress: &mut Progress,
    ) -> std::result::Result<(), SagaError> {
        for step in completed.iter().rev() {
            if let Err(source) = step.compensate(ctx).await {
                metrics::counter!("saga_compensation_failed_total").increment(1);
                tracing::error!(
                    saga_type = self.saga_type,
                    failed_step,
                    compensation_step = step.name(),
                    error = %source,
                    cause = %cause,
                    "compensation failed; manual intervention required"
                );
                progress.advance(SagaState::CompensationFailed);
                return Err(SagaError::CompensationFailed {
                    failed_step,
                    compensation_step: step.name(),
                    source,
                    cause: Box::new(cause),
                });
            }
            tracing::warn!(saga_type = self.saga_type, step = step.name(), "saga step compensated");
        }

        progress.advance(SagaState::Compensated);
        Err(SagaError::StepFailed {
            step: failed_step,
            source: cause,
        })
    }
}

struct Progress {
    saga_type: &'static str,
    state: SagaState,
}

impl Progress {
    fn new(saga_type: &'static str) -> Self {
        Self {
            saga_type,
            state: SagaState::NotStarted,
        }
    }

    fn advance(&mut self, next: SagaState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal saga transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(saga_type = self.saga_type, from = %self.state, to = %next, "saga state changed");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use domain::DomainError;

    #[derive(Default)]
    struct Journal {
        entries: Vec<String>,
    }

    struct Recorded {
        name: &'static str,
        fail_execute: bool,
        fail_verify: bool,
        fail_compensate: bool,
    }

    impl Recorded {
        fn ok(name: &'static str) -> Self {
            Self {
                name,
                fail_execute: false,
                fail_verify: false,
                fail_compensate: false,
            }
        }
    }

    #[async_trait]
    impl SagaStep<Journal> for Recorded {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn execute(&self, ctx: &mut Journal) -> Result<()> {
            if self.fail_execute {
                return Err(DomainError::invalid_argument("boom").into());
            }
            ctx.entries.push(format!("do {}", self.name));
            Ok(())
        }

        fn verify(&self, _ctx: &Journal) -> Result<()> {
            if self.fail_verify {
                return Err(ServiceError::postcondition(self.name, "wrong state"));
            }
            Ok(())
        }

        async fn compensate(&self, ctx: &mut Journal) -> Result<()> {
            if self.fail_compensate {
                return Err(DomainError::invalid_argument("cannot undo").into());
            }
            ctx.entries.push(format!("undo {}", self.name));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_all_steps_run_in_order() {
        let runner = SagaRunner::new("Test")
            .step(Recorded::ok("a"))
            .step(Recorded::ok("b"))
            .step(Recorded::ok("c"));
        let mut journal = Journal::default();

        runner.run(&mut journal).await.unwrap();
        assert_eq!(journal.entries, vec!["do a", "do b", "do c"]);
        assert_eq!(runner.step_names(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failure_unwinds_completed_steps_in_reverse() {
        let runner = SagaRunner::new("Test")
            .step(Recorded::ok("a"))
            .step(Recorded::ok("b"))
            .step(Recorded {
                fail_execute: true,
                ..Recorded::ok("c")
            })
            .step(Recorded::ok("d"));
        let mut journal = Journal::default();

        let err = runner.run(&mut journal).await.unwrap_err();
        assert!(matches!(err, SagaError::StepFailed { step: "c", .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(journal.entries, vec!["do a", "do b", "undo b", "undo a"]);
    }

    #[tokio::test]
    async fn test_failed_postcondition_compensates_the_step_itself() {
        let runner = SagaRunner::new("Test")
            .step(Recorded::ok("a"))
            .step(Recorded {
                fail_verify: true,
                ..Recorded::ok("b")
            });
        let mut journal = Journal::default();

        let err = runner.run(&mut journal).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Postcondition);
        assert_eq!(journal.entries, vec!["do a", "do b", "undo b", "undo a"]);
    }

    #[tokio::test]
    async fn test_first_step_failure_needs_no_compensation() {
        let runner = SagaRunner::new("Test").step(Recorded {
            fail_execute: true,
            ..Recorded::ok("a")
        });
        let mut journal = Journal::default();

        let err = runner.run(&mut journal).await.unwrap_err();
        assert_eq!(err.failed_step(), "a");
        assert!(journal.entries.is_empty());
    }

    #[tokio::test]
    async fn test_compensation_failure_stops_unwinding() {
        let runner = SagaRunner::new("Test")
            .step(Recorded::ok("a"))
            .step(Recorded {
                fail_compensate: true,
                ..Recorded::ok("b")
            })
            .step(Recorded::ok("c"))
            .step(Recorded {
                fail_execute: true,
                ..Recorded::ok("d")
            });
        let mut journal = Journal::default();

        let err = runner.run(&mut journal).await.unwrap_err();
        match err {
            SagaError::CompensationFailed {
                failed_step,
                compensation_step,
                ref cause,
                ..
            } => {
                assert_eq!(failed_step, "d");
                assert_eq!(compensation_step, "b");
                assert_eq!(cause.kind(), ErrorKind::InvalidArgument);
            }
            other => panic!("expected CompensationFailed, got {other:?}"),
        }
        // "a" is never undone once "b" fails to compensate.
        assert_eq!(journal.entries, vec!["do a", "do b", "do c", "undo c"]);
    }
}
