use super::{Expr, ExprSpatial, GeometryRef, VisitMut};
use crate::Fingerprint;

use indexmap::IndexMap;

/// Materialized artifacts available to a translation, keyed by the
/// [`ExprSpatial::bake_key`] of the predicate they stand in for.
///
/// A spatial predicate whose key is bound renders against the artifact
/// instead of re-buffering its reference.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    artifacts: IndexMap<Fingerprint, ArtifactBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBinding {
    pub name: String,

    /// SRID of the stored geometries.
    pub srid: u32,
}

impl Bindings {
    pub fn new() -> Bindings {
        Bindings::default()
    }

    pub fn bind(&mut self, key: Fingerprint, name: impl Into<String>, srid: u32) {
        self.artifacts.insert(
            key,
            ArtifactBinding {
                name: name.into(),
                srid,
            },
        );
    }

    pub fn get(&self, node: &ExprSpatial) -> Option<&ArtifactBinding> {
        self.artifacts.get(&node.bake_key())
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let mut pairs: Vec<_> = self
            .artifacts
            .iter()
            .map(|(key, binding)| (key.to_string(), binding.name.as_str()))
            .collect();
        pairs.sort();
        Fingerprint::of(&pairs)
    }

    /// Returns `expr` with every bound spatial reference replaced by its
    /// artifact.
    pub fn apply(&self, expr: &Expr) -> Expr {
        let mut expr = expr.clone();
        if self.is_empty() {
            return expr;
        }

        let mut rewrite = |node: &mut ExprSpatial| {
            if let Some(binding) = self.get(node) {
                node.reference = GeometryRef::Artifact {
                    name: binding.name.clone(),
                    srid: binding.srid,
                };
            }
        };
        rewrite.visit_expr_mut(&mut expr);
        expr
    }
}
