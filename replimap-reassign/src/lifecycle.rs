//! Lifecycle controller
//!
//! Drives one generate/verify/apply/rollback transition per invocation.
//! Preconditions come from the persisted artifact store, effects go through
//! the reassignment engine port; a failed transition leaves the machine at
//! its pre-transition state, except rollback, whose failure is terminal.

use replimap_core::model::BrokerId;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::artifacts::{ArtifactError, ArtifactStore, LifecycleState};
use crate::engine::{EngineError, ReassignmentEngine, VerifyReport};
use crate::plan::ReassignmentPlan;

/// Lifecycle errors
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("{op} is not valid from the {state} state")]
    InvalidTransition {
        op: &'static str,
        state: LifecycleState,
    },

    #[error("No reassignment plan has been generated")]
    NoPlan,

    #[error("Plan generation failed: {output}")]
    GenerationFailed { output: String },

    #[error("Rollback failed, operator intervention required: {output}")]
    RollbackFailed { output: String },

    #[error(transparent)]
    Artifacts(#[from] ArtifactError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

/// The generate → verify → apply → rollback state machine.
pub struct LifecycleController<E> {
    store: ArtifactStore,
    engine: E,
}

impl<E: ReassignmentEngine> LifecycleController<E> {
    pub fn new(store: ArtifactStore, engine: E) -> Self {
        Self { store, engine }
    }

    pub fn state(&self) -> Result<LifecycleState> {
        Ok(self.store.state()?)
    }

    /// Dry-run the plan against the engine and persist the resulting
    /// proposed/current pair as the plan and backup artifacts.
    #[instrument(skip(self, plan, broker_list))]
    pub async fn generate(
        &self,
        plan: &ReassignmentPlan,
        broker_list: &[BrokerId],
    ) -> Result<()> {
        let _lock = self.store.lock()?;

        let state = self.store.state()?;
        if !matches!(
            state,
            LifecycleState::Idle | LifecycleState::Completed | LifecycleState::RolledBack
        ) {
            return Err(LifecycleError::InvalidTransition {
                op: "generate",
                state,
            });
        }

        let assignments = match self.engine.generate(&plan.to_json(), broker_list).await {
            Ok(assignments) => assignments,
            Err(EngineError::Rejected { output }) => {
                error!(output = %output, "Engine rejected plan generation");
                return Err(LifecycleError::GenerationFailed { output });
            }
            Err(e) => return Err(e.into()),
        };

        self.store
            .store_pair(&assignments.proposed, &assignments.current)?;

        info!(
            topics = plan.topics.len(),
            brokers = broker_list.len(),
            "Reassignment plan and backup generated"
        );
        Ok(())
    }

    /// Report per-partition progress of the current plan. Never touches the
    /// plan/backup artifacts; once an applied plan reports every partition
    /// complete, the cycle is recorded as completed.
    #[instrument(skip(self))]
    pub async fn verify(&self) -> Result<VerifyReport> {
        // Verify can record cycle completion, so it holds the lock too
        let _lock = self.store.lock()?;

        let state = self.store.state()?;
        match state {
            LifecycleState::Generated | LifecycleState::Applied => {}
            LifecycleState::Idle => return Err(LifecycleError::NoPlan),
            _ => {
                return Err(LifecycleError::InvalidTransition {
                    op: "verify",
                    state,
                })
            }
        }

        let plan = self.store.load_plan()?;
        let report = self.engine.verify(&plan).await?;

        info!(summary = %report.summary(), "Verify report");

        if state == LifecycleState::Applied && report.all_completed() {
            self.store.set_state(LifecycleState::Completed)?;
            info!("Reassignment cycle completed");
        }

        Ok(report)
    }

    /// Execute the current plan. Retryable: a failed apply leaves the plan
    /// and backup untouched in the `Generated` state.
    #[instrument(skip(self))]
    pub async fn apply(&self) -> Result<()> {
        let _lock = self.store.lock()?;

        let state = self.store.state()?;
        match state {
            LifecycleState::Generated => {}
            LifecycleState::Idle => return Err(LifecycleError::NoPlan),
            _ => {
                return Err(LifecycleError::InvalidTransition { op: "apply", state });
            }
        }

        let plan = self.store.load_plan()?;
        self.engine.execute(&plan).await?;
        self.store.set_state(LifecycleState::Applied)?;

        info!("Reassignment plan applied");
        Ok(())
    }

    /// Execute the backup assignment, undoing the current plan. Success
    /// consumes the plan/backup pair; failure is terminal and requires
    /// operator action, no automated recovery exists past this point.
    #[instrument(skip(self))]
    pub async fn rollback(&self) -> Result<()> {
        let _lock = self.store.lock()?;

        let state = self.store.state()?;
        match state {
            LifecycleState::Generated | LifecycleState::Applied => {}
            LifecycleState::Idle => return Err(LifecycleError::NoPlan),
            _ => {
                return Err(LifecycleError::InvalidTransition {
                    op: "rollback",
                    state,
                });
            }
        }

        let backup = self.store.load_backup()?;
        if let Err(e) = self.engine.execute(&backup).await {
            let output = match e {
                EngineError::Rejected { output } => output,
                other => other.to_string(),
            };
            error!(output = %output, "Rollback execution failed");
            return Err(LifecycleError::RollbackFailed { output });
        }

        self.store.mark_consumed()?;
        info!("Rollback applied, plan and backup consumed");
        Ok(())
    }
}
