use super::*;

/// Mutable traversal of an expression tree.
pub trait VisitMut: Sized {
    fn visit_expr_mut(&mut self, i: &mut Expr) {
        visit_expr_mut(self, i);
    }

    fn visit_expr_spatial_mut(&mut self, i: &mut ExprSpatial) {
        visit_expr_spatial_mut(self, i);
    }
}

pub fn visit_expr_mut<V: VisitMut>(v: &mut V, node: &mut Expr) {
    match node {
        Expr::And(expr) => expr.operands.iter_mut().for_each(|e| v.visit_expr_mut(e)),
        Expr::Or(expr) => expr.operands.iter_mut().for_each(|e| v.visit_expr_mut(e)),
        Expr::Not(expr) => v.visit_expr_mut(&mut expr.expr),
        Expr::BinaryOp(expr) => {
            v.visit_expr_mut(&mut expr.lhs);
            v.visit_expr_mut(&mut expr.rhs);
        }
        Expr::Cast(expr) => v.visit_expr_mut(&mut expr.expr),
        Expr::Func(expr) => expr.args.iter_mut().for_each(|e| v.visit_expr_mut(e)),
        Expr::InList(expr) => {
            v.visit_expr_mut(&mut expr.expr);
            expr.list.iter_mut().for_each(|e| v.visit_expr_mut(e));
        }
        Expr::IsNull(expr) => v.visit_expr_mut(&mut expr.expr),
        Expr::Like(expr) => {
            v.visit_expr_mut(&mut expr.expr);
            v.visit_expr_mut(&mut expr.pattern);
        }
        Expr::Spatial(expr) => v.visit_expr_spatial_mut(expr),
        Expr::Column(_) | Expr::Raw(_) | Expr::Value(_) => {}
    }
}

pub fn visit_expr_spatial_mut<V: VisitMut>(_v: &mut V, _node: &mut ExprSpatial) {}

impl<F: FnMut(&mut ExprSpatial)> VisitMut for F {
    fn visit_expr_spatial_mut(&mut self, i: &mut ExprSpatial) {
        self(i);
    }
}
