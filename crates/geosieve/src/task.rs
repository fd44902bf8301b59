mod orchestrator;
pub(crate) use orchestrator::Orchestrator;

use crate::result::{ResultSet, StrategyPlan};

use geosieve_core::{schema::DatasetId, Error};

/// Identifies a submitted filter job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl core::fmt::Display for TaskId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    /// Terminal states never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
        )
    }
}

/// A snapshot of a job.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub id: TaskId,
    pub dataset: DatasetId,
    pub state: TaskState,

    /// Percent done. Only progressive and two-phase plans report
    /// intermediate values.
    pub progress: u8,

    /// Set once the plan is chosen.
    pub plan: Option<StrategyPlan>,

    /// Set when the job succeeded.
    pub result: Option<ResultSet>,

    /// Set when the job failed or was cancelled.
    pub error: Option<Error>,
}

impl TaskHandle {
    pub(crate) fn pending(id: TaskId, dataset: DatasetId) -> TaskHandle {
        TaskHandle {
            id,
            dataset,
            state: TaskState::Pending,
            progress: 0,
            plan: None,
            result: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// The result, or the error the job ended with.
    pub fn into_result(self) -> geosieve_core::Result<ResultSet> {
        match (self.result, self.error) {
            (Some(result), _) => Ok(result),
            (None, Some(err)) => Err(err),
            (None, None) => Err(geosieve_core::err!("{} has not finished", self.id)),
        }
    }
}
