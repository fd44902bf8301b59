use crate::{result::StrategyPlan, task::TaskHandle};

use geosieve_core::{Error, Result};

use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// What a running job can see of its task: the cancellation signal and the
/// channel its progress is published on.
#[derive(Debug, Clone)]
pub(crate) struct JobCtx {
    cancel: CancellationToken,
    status: Arc<watch::Sender<TaskHandle>>,
}

impl JobCtx {
    pub(crate) fn new(cancel: CancellationToken, status: Arc<watch::Sender<TaskHandle>>) -> JobCtx {
        JobCtx { cancel, status }
    }

    /// A context no one is watching, for running the engine directly.
    #[cfg(test)]
    pub(crate) fn detached(dataset: &str) -> JobCtx {
        let handle = TaskHandle::pending(crate::task::TaskId(0), dataset.into());
        let (status, _) = watch::channel(handle);
        JobCtx::new(CancellationToken::new(), Arc::new(status))
    }

    /// Fails with a cancellation error once the task was cancelled.
    pub(crate) fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::filter_cancelled());
        }
        Ok(())
    }

    pub(crate) fn progress(&self, pct: u8) {
        let pct = pct.min(100);
        self.status.send_if_modified(|handle| {
            if handle.progress == pct {
                return false;
            }
            handle.progress = pct;
            true
        });
    }

    pub(crate) fn plan(&self, plan: StrategyPlan) {
        self.status.send_modify(|handle| handle.plan = Some(plan));
    }

    #[cfg(test)]
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    #[cfg(test)]
    pub(crate) fn handle(&self) -> TaskHandle {
        self.status.borrow().clone()
    }
}
