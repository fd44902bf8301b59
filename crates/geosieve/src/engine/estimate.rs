use crate::{config::EngineConfig, result::StrategyPlan};

use geosieve_core::{
    driver::{Capability, DatasetStats},
    stmt::Expr,
};

/// The parts of an effective filter the estimator looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shape {
    pub(crate) has_spatial: bool,

    /// A top-level conjunct is a spatial predicate whose matches all have
    /// intersecting bounding boxes.
    pub(crate) boundable: bool,
}

impl Shape {
    pub(crate) fn of(filter: &Expr) -> Shape {
        Shape {
            has_spatial: filter.has_spatial(),
            boundable: filter.conjuncts().iter().any(|conjunct| {
                matches!(conjunct, Expr::Spatial(spatial) if spatial.relation.is_boundable())
            }),
        }
    }
}

/// Picks the plan for a filter. The same inputs always give the same plan.
///
/// When several plans would work the cheaper one wins, in the order direct,
/// two-phase, materialized, progressive.
pub(crate) fn estimate(
    shape: Shape,
    capability: &Capability,
    stats: DatasetStats,
    cached: bool,
    config: &EngineConfig,
) -> StrategyPlan {
    if cached {
        return StrategyPlan::Cached;
    }

    if !shape.has_spatial || stats.row_count <= config.small_dataset_threshold {
        return StrategyPlan::Direct;
    }

    if shape.boundable
        && capability.has_spatial_index()
        && stats.row_count > config.two_phase_threshold
    {
        return StrategyPlan::TwoPhase;
    }

    if capability.materialized_artifacts {
        return StrategyPlan::Materialized;
    }

    StrategyPlan::Progressive
}
