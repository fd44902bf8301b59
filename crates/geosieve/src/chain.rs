use geosieve_core::{
    schema::DatasetId,
    stmt::{CombineOp, Expr, FilterRequest},
    Error, Result,
};

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// The committed filter steps of every dataset.
#[derive(Debug, Default)]
pub(crate) struct Chains {
    chains: Mutex<HashMap<DatasetId, Vec<Step>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    /// Effective filter after this step
    pub(crate) effective: Expr,

    /// Buffer distance in force after this step
    pub(crate) buffer: f64,
}

/// A request combined with the chain it extends, ready to run.
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
    pub(crate) position: usize,
    pub(crate) step: Step,
}

impl Chains {
    pub(crate) fn new() -> Chains {
        Chains::default()
    }

    /// Combines `request` with the steps before its position. Nothing is
    /// recorded until [`commit`](Self::commit).
    pub(crate) fn prepare(&self, request: &FilterRequest) -> Result<Prepared> {
        let chains = self.lock();
        let steps = chains.get(&request.dataset).map_or(&[][..], Vec::as_slice);

        let position = request.chain_position;
        if position > steps.len() {
            return Err(Error::invalid_request(format!(
                "chain position {position} on `{}` skips steps; the chain has {} step(s)",
                request.dataset,
                steps.len()
            )));
        }

        let previous = position.checked_sub(1).map(|i| &steps[i]);
        let inherited = previous.map_or(0.0, |step| step.buffer);

        let buffer = request
            .spatial_predicate
            .as_ref()
            .and_then(|predicate| predicate.buffer)
            .unwrap_or(inherited);

        let effective = match (previous, request.step_expr(inherited)) {
            (Some(previous), Some(current)) => {
                request.combine_op.combine(previous.effective.clone(), current)
            }
            (None, Some(current)) => match request.combine_op {
                CombineOp::AndNot => Expr::not(current),
                CombineOp::And | CombineOp::Or => current,
            },
            (Some(previous), None) => previous.effective.clone(),
            (None, None) => Expr::from(true),
        };

        Ok(Prepared {
            position,
            step: Step { effective, buffer },
        })
    }

    /// Records a successful step, dropping any steps it replaces. Returns
    /// the chain as it now stands.
    pub(crate) fn commit(&self, dataset: &DatasetId, prepared: Prepared) -> Vec<Step> {
        let mut chains = self.lock();
        let steps = chains.entry(dataset.clone()).or_default();
        steps.truncate(prepared.position);
        steps.push(prepared.step);
        steps.clone()
    }

    pub(crate) fn last(&self, dataset: &DatasetId) -> Option<Step> {
        self.lock().get(dataset).and_then(|steps| steps.last().cloned())
    }

    pub(crate) fn len(&self, dataset: &DatasetId) -> usize {
        self.lock().get(dataset).map_or(0, Vec::len)
    }

    /// Replaces the chain with restored steps. No steps clears it.
    pub(crate) fn restore(&self, dataset: &DatasetId, steps: Vec<Step>) {
        let mut chains = self.lock();
        if steps.is_empty() {
            chains.remove(dataset);
        } else {
            chains.insert(dataset.clone(), steps);
        }
    }

    pub(crate) fn reset(&self, dataset: &DatasetId) {
        self.lock().remove(dataset);
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DatasetId, Vec<Step>>> {
        self.chains.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
