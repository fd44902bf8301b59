use super::{Expr, ExprSpatial, GeometryRef, SpatialRelation};
use crate::schema::DatasetId;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single filter step against one dataset.
#[derive(Debug, Clone)]
pub struct FilterRequest {
    pub dataset: DatasetId,

    pub attribute_filter: Option<Expr>,

    pub spatial_predicate: Option<SpatialPredicate>,

    /// How this step combines with the dataset's previous effective filter.
    pub combine_op: CombineOp,

    /// 0 starts a new chain. `n` replaces step `n` (and drops later steps)
    /// of the current chain.
    pub chain_position: usize,

    /// Overrides the engine's default timeout.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpatialPredicate {
    pub relation: SpatialRelation,
    pub reference: GeometryRef,

    /// `None` keeps the buffer distance of the current chain.
    pub buffer: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineOp {
    #[default]
    And,
    Or,
    AndNot,
}

impl FilterRequest {
    pub fn new(dataset: impl Into<DatasetId>) -> FilterRequest {
        FilterRequest {
            dataset: dataset.into(),
            attribute_filter: None,
            spatial_predicate: None,
            combine_op: CombineOp::And,
            chain_position: 0,
            timeout: None,
        }
    }

    pub fn attribute(mut self, filter: impl Into<Expr>) -> Self {
        self.attribute_filter = Some(filter.into());
        self
    }

    pub fn spatial(mut self, predicate: SpatialPredicate) -> Self {
        self.spatial_predicate = Some(predicate);
        self
    }

    pub fn combine(mut self, op: CombineOp) -> Self {
        self.combine_op = op;
        self
    }

    pub fn position(mut self, chain_position: usize) -> Self {
        self.chain_position = chain_position;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// This step's own filter, before combining with the chain. A spatial
    /// predicate without an explicit buffer takes `inherited_buffer`.
    pub fn step_expr(&self, inherited_buffer: f64) -> Option<Expr> {
        let spatial = self.spatial_predicate.as_ref().map(|predicate| {
            Expr::from(ExprSpatial {
                relation: predicate.relation,
                reference: predicate.reference.clone(),
                buffer: predicate.buffer.unwrap_or(inherited_buffer),
            })
        });

        match (self.attribute_filter.clone(), spatial) {
            (Some(attr), Some(spatial)) => Some(Expr::and(attr, spatial)),
            (Some(expr), None) | (None, Some(expr)) => Some(expr),
            (None, None) => None,
        }
    }
}

impl SpatialPredicate {
    pub fn new(relation: SpatialRelation, reference: GeometryRef) -> SpatialPredicate {
        SpatialPredicate {
            relation,
            reference,
            buffer: None,
        }
    }

    pub fn buffer(mut self, distance: f64) -> Self {
        self.buffer = Some(distance);
        self
    }
}

impl CombineOp {
    /// Combines the previous effective filter with the current step.
    pub fn combine(self, previous: Expr, current: Expr) -> Expr {
        match self {
            CombineOp::And => Expr::and(previous, current),
            CombineOp::Or => Expr::or(previous, current),
            CombineOp::AndNot => Expr::and_not(previous, current),
        }
    }
}
