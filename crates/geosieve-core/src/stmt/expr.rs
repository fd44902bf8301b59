use super::*;
use crate::schema::DatasetId;

use serde::{Deserialize, Serialize};

/// Backend-neutral filter expression.
///
/// Every filter the engine runs is built from this tree. Backends only ever
/// see it rendered through their capability descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// AND a set of expressions
    And(ExprAnd),

    /// Binary comparison
    BinaryOp(ExprBinaryOp),

    /// Cast an expression to a different type
    Cast(ExprCast),

    /// References an attribute of the filtered dataset
    Column(ExprColumn),

    /// Canonical function call
    Func(ExprFunc),

    /// In list
    InList(ExprInList),

    /// Whether an expression is (or is not) null
    IsNull(ExprIsNull),

    /// Pattern match with `%` and `_` wildcards
    Like(ExprLike),

    /// Negation
    Not(ExprNot),

    /// OR a set of expressions
    Or(ExprOr),

    /// Relates the feature geometry to a reference geometry
    Spatial(ExprSpatial),

    /// Native SQL passed through untouched. SQL backends only.
    Raw(String),

    /// Constant value
    Value(Value),
}

impl Expr {
    pub fn null() -> Self {
        Self::Value(Value::Null)
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    /// Returns true if the expression is the `true` boolean expression
    pub fn is_true(&self) -> bool {
        matches!(self, Self::Value(Value::Bool(true)))
    }

    /// Returns `true` if the expression is the `false` boolean expression
    pub fn is_false(&self) -> bool {
        matches!(self, Self::Value(Value::Bool(false)))
    }

    pub fn is_spatial(&self) -> bool {
        matches!(self, Self::Spatial(_))
    }

    /// Returns true if any node of the tree is a spatial predicate.
    pub fn has_spatial(&self) -> bool {
        !self.spatial_nodes().is_empty()
    }

    /// All spatial predicates in the tree, in depth-first order.
    pub fn spatial_nodes(&self) -> Vec<&ExprSpatial> {
        struct Collect<'a>(Vec<&'a ExprSpatial>);

        impl<'a> Visit<'a> for Collect<'a> {
            fn visit_expr_spatial(&mut self, i: &'a ExprSpatial) {
                self.0.push(i);
                visit::visit_expr_spatial(self, i);
            }
        }

        let mut collect = Collect(vec![]);
        collect.visit_expr(self);
        collect.0
    }

    /// Operands of the top-level conjunction. A non-`AND` expression is its
    /// own single conjunct.
    pub fn conjuncts(&self) -> &[Expr] {
        match self {
            Self::And(expr_and) => &expr_and.operands,
            expr => std::slice::from_ref(expr),
        }
    }

    /// Datasets referenced by spatial predicates, without duplicates.
    pub fn referenced_datasets(&self) -> Vec<DatasetId> {
        let mut out: Vec<DatasetId> = vec![];
        for node in self.spatial_nodes() {
            if let GeometryRef::Dataset { dataset, .. } = &node.reference {
                if !out.contains(dataset) {
                    out.push(dataset.clone());
                }
            }
        }
        out
    }

    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::Value(Value::Null))
    }
}

impl Default for Expr {
    fn default() -> Self {
        Self::Value(Value::Bool(true))
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Value(value.into())
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Self::Value(value.into())
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Value(value.into())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Value(value.into())
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn roads_within(buffer: f64) -> Expr {
        ExprSpatial {
            relation: SpatialRelation::Intersects,
            reference: GeometryRef::dataset("roads"),
            buffer,
        }
        .into()
    }

    #[test]
    fn and_flattens_nested_conjunctions() {
        let expr = Expr::and(
            Expr::and(Expr::gt(Expr::column("pop"), 1000_i64), roads_within(10.0)),
            Expr::eq(Expr::column("kind"), "urban"),
        );
        assert_eq!(expr.conjuncts().len(), 3);
    }

    #[test]
    fn and_with_true_is_identity() {
        let expr = Expr::gt(Expr::column("pop"), 1000_i64);
        assert_eq!(Expr::and(true, expr.clone()), expr);
    }

    #[test]
    fn collects_spatial_nodes_below_not() {
        let expr = Expr::or(
            Expr::not(roads_within(5.0)),
            Expr::is_null(Expr::column("name")),
        );
        let nodes = expr.spatial_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].buffer, 5.0);
        assert_eq!(expr.referenced_datasets(), vec![DatasetId::from("roads")]);
    }
}
