#![allow(unused_variables)]

use super::*;

/// Read-only traversal of an expression tree.
pub trait Visit<'a>: Sized {
    fn visit_expr(&mut self, i: &'a Expr) {
        visit_expr(self, i);
    }

    fn visit_expr_spatial(&mut self, i: &'a ExprSpatial) {
        visit_expr_spatial(self, i);
    }

    fn visit_expr_column(&mut self, i: &'a ExprColumn) {}

    fn visit_value(&mut self, i: &'a Value) {}
}

pub fn visit_expr<'a, V: Visit<'a>>(v: &mut V, node: &'a Expr) {
    match node {
        Expr::And(expr) => expr.operands.iter().for_each(|e| v.visit_expr(e)),
        Expr::Or(expr) => expr.operands.iter().for_each(|e| v.visit_expr(e)),
        Expr::Not(expr) => v.visit_expr(&expr.expr),
        Expr::BinaryOp(expr) => {
            v.visit_expr(&expr.lhs);
            v.visit_expr(&expr.rhs);
        }
        Expr::Cast(expr) => v.visit_expr(&expr.expr),
        Expr::Column(expr) => v.visit_expr_column(expr),
        Expr::Func(expr) => expr.args.iter().for_each(|e| v.visit_expr(e)),
        Expr::InList(expr) => {
            v.visit_expr(&expr.expr);
            expr.list.iter().for_each(|e| v.visit_expr(e));
        }
        Expr::IsNull(expr) => v.visit_expr(&expr.expr),
        Expr::Like(expr) => {
            v.visit_expr(&expr.expr);
            v.visit_expr(&expr.pattern);
        }
        Expr::Spatial(expr) => v.visit_expr_spatial(expr),
        Expr::Raw(_) => {}
        Expr::Value(value) => v.visit_value(value),
    }
}

/// Does not descend into a reference dataset's filter: its columns belong to
/// the reference dataset, not the one being filtered.
pub fn visit_expr_spatial<'a, V: Visit<'a>>(v: &mut V, node: &'a ExprSpatial) {}
