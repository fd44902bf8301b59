use crate::logging_driver::DriverOp;
use geosieve::{driver::operation::Scan, driver::Operation, DatasetId};
use std::sync::{Arc, Mutex};

/// A wrapper around the operations log that provides a clean API for tests
#[derive(Debug, Clone)]
pub struct ExecLog {
    ops: Arc<Mutex<Vec<DriverOp>>>,
}

impl ExecLog {
    pub(crate) fn new(ops: Arc<Mutex<Vec<DriverOp>>>) -> Self {
        Self { ops }
    }

    /// Get the number of logged operations
    pub fn len(&self) -> usize {
        self.ops.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().unwrap().is_empty()
    }

    /// Count operations matching the given predicate
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Operation) -> bool,
    {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|op| predicate(&op.operation))
            .count()
    }

    /// Number of artifacts the backend was asked to build
    pub fn materializations(&self) -> usize {
        self.count(|op| match op {
            Operation::Materialize(_) => true,
            Operation::ExecSql(op) => op
                .statements
                .iter()
                .any(|sql| sql.starts_with("CREATE TABLE") || sql.starts_with("CREATE MATERIALIZED VIEW")),
            _ => false,
        })
    }

    /// Number of candidate batches of two-phase filters
    pub fn candidate_queries(&self) -> usize {
        self.count(|op| {
            matches!(
                op,
                Operation::QueryFilter(op) if matches!(op.scan, Scan::Candidates(_))
            )
        })
    }

    /// Number of rendered SQL queries, row counts included
    pub fn sql_queries(&self) -> usize {
        self.count(|op| matches!(op, Operation::QuerySql(_)))
    }

    /// Number of pages of progressive scans
    pub fn chunk_queries(&self) -> usize {
        self.count(|op| {
            matches!(
                op,
                Operation::QueryFilter(op) if matches!(op.scan, Scan::Chunk { .. })
            )
        })
    }

    /// The dataset each logged operation was about, in execution order.
    /// Operations not tied to a dataset are skipped.
    pub fn datasets(&self) -> Vec<DatasetId> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match &op.operation {
                Operation::QueryFilter(op) => Some(op.dataset.clone()),
                Operation::Stats(op) => Some(op.dataset.clone()),
                Operation::Materialize(op) => Some(op.target.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of the logged operations, in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .map(|op| op.operation.name())
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.ops.lock().unwrap().iter().filter(|op| op.failed).count()
    }

    /// Clear the log
    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }

    /// Get access to all operations for custom assertions
    pub fn with_ops<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[DriverOp]) -> R,
    {
        let ops = self.ops.lock().unwrap();
        f(&ops)
    }
}
