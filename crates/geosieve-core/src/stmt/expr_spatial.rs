use super::{Expr, GeometryRef, SpatialRelation};
use crate::Fingerprint;

use serde::{Deserialize, Serialize};

/// Relates each feature's geometry to a (possibly buffered) reference
/// geometry.
///
/// The feature geometry is always the filtered dataset's geometry column, so
/// only the reference side is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprSpatial {
    pub relation: SpatialRelation,
    pub reference: GeometryRef,

    /// Buffer distance applied to the reference, in the target's linear
    /// units. Negative values erode polygons.
    pub buffer: f64,
}

impl ExprSpatial {
    pub fn new(relation: SpatialRelation, reference: GeometryRef) -> ExprSpatial {
        ExprSpatial {
            relation,
            reference,
            buffer: 0.0,
        }
    }

    /// Identity of the buffered reference geometry, independent of the
    /// relation used against it. Two predicates with the same key can share
    /// one materialized artifact.
    pub fn bake_key(&self) -> Fingerprint {
        let reference = match &self.reference {
            GeometryRef::Artifact { name, .. } => return Fingerprint::of(name),
            reference => reference,
        };
        Fingerprint::of(&(reference, self.buffer))
    }

    pub fn is_buffered(&self) -> bool {
        self.buffer != 0.0
    }
}

impl From<ExprSpatial> for Expr {
    fn from(value: ExprSpatial) -> Self {
        Self::Spatial(value)
    }
}
