use crate::driver::CanonicalFn;

use serde::{Deserialize, Serialize};

/// Topological relation between a feature and the reference geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialRelation {
    Intersects,
    Contains,
    Within,
    Touches,
    Crosses,
    Overlaps,
    Disjoint,
    Equals,

    /// Bounding boxes intersect. A cheap superset of `Intersects`, used for
    /// candidate selection.
    BboxIntersects,
}

impl SpatialRelation {
    pub fn canonical(self) -> CanonicalFn {
        match self {
            Self::Intersects => CanonicalFn::Intersects,
            Self::Contains => CanonicalFn::Contains,
            Self::Within => CanonicalFn::Within,
            Self::Touches => CanonicalFn::Touches,
            Self::Crosses => CanonicalFn::Crosses,
            Self::Overlaps => CanonicalFn::Overlaps,
            Self::Disjoint => CanonicalFn::Disjoint,
            Self::Equals => CanonicalFn::Equals,
            Self::BboxIntersects => CanonicalFn::BboxIntersects,
        }
    }

    /// Whether every match also has intersecting bounding boxes, which makes
    /// a bounding-box prefilter a safe superset.
    pub fn is_boundable(self) -> bool {
        !matches!(self, Self::Disjoint)
    }
}
