use super::{Comma, Delimited, Formatter, Ident, TableName, ToSql, REF_ALIAS};

use geosieve_core::{
    driver::{CanonicalFn, NativeFn},
    stmt::{self, Expr, Type},
    Error, Result,
};

impl ToSql for &Expr {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        use Expr::*;

        match self {
            And(expr) if expr.operands.is_empty() => fmt!(f, &stmt::Value::Bool(true)),
            And(expr) => {
                fmt!(f, "(" Delimited(&expr.operands, " AND ") ")");
            }
            Or(expr) if expr.operands.is_empty() => fmt!(f, &stmt::Value::Bool(false)),
            Or(expr) => {
                fmt!(f, "(" Delimited(&expr.operands, " OR ") ")");
            }
            Not(expr) => {
                let inner = &*expr.expr;
                fmt!(f, "NOT (" inner ")");
            }
            BinaryOp(expr) => {
                let lhs_ty = declared_type(f, &expr.lhs);
                let rhs_ty = declared_type(f, &expr.rhs);

                fmt!(f, Coerced(&expr.lhs, rhs_ty) " " expr.op " " Coerced(&expr.rhs, lhs_ty));
            }
            Cast(expr) => {
                fmt!(f, expr);
            }
            Column(expr) => {
                fmt!(f, expr);
            }
            Func(expr) => {
                fmt!(f, expr);
            }
            InList(expr) if expr.list.is_empty() => {
                fmt!(f, &stmt::Value::Bool(expr.negate));
            }
            InList(expr) => {
                let ty = declared_type(f, &expr.expr);
                let list = Comma(expr.list.iter().map(|item| Coerced(item, ty)));

                if expr.negate {
                    fmt!(f, &*expr.expr " NOT IN (" list ")");
                } else {
                    fmt!(f, &*expr.expr " IN (" list ")");
                }
            }
            IsNull(expr) => {
                if expr.negate {
                    fmt!(f, &*expr.expr " IS NOT NULL");
                } else {
                    fmt!(f, &*expr.expr " IS NULL");
                }
            }
            Like(expr) => {
                let op = if expr.case_insensitive {
                    match f.capability().native_fn(CanonicalFn::ILike) {
                        Some(NativeFn::Operator(op)) => op,
                        _ => return Err(unmapped(f, CanonicalFn::ILike)),
                    }
                } else {
                    "LIKE"
                };
                let pattern = &*expr.pattern;
                fmt!(f, &*expr.expr " " op " " pattern);
            }
            Spatial(expr) => {
                fmt!(f, expr);
            }
            Raw(sql) => {
                if !f.serializer.is_sql() {
                    return Err(Error::expression_translation(format!(
                        "raw SQL cannot run on {}",
                        f.capability().kind
                    )));
                }
                fmt!(f, "(" sql ")");
            }
            Value(value) => {
                fmt!(f, value);
            }
        }

        Ok(())
    }
}

impl ToSql for &stmt::ExprColumn {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        if f.serializer.is_sql() {
            let target = f.target;
            match f.reference {
                Some(_) => fmt!(f, Ident(REF_ALIAS) "."),
                None => fmt!(f, TableName(&target.table) "."),
            }
        }
        fmt!(f, Ident(&self.name));
        Ok(())
    }
}

impl ToSql for &stmt::ExprFunc {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        match f.capability().native_fn(self.func) {
            Some(NativeFn::Function(name)) => {
                fmt!(f, name "(" Comma(&self.args) ")");
            }
            Some(NativeFn::Operator(op)) => {
                let [lhs, rhs] = &self.args[..] else {
                    return Err(Error::expression_translation(format!(
                        "operator `{op}` takes two arguments, got {}",
                        self.args.len()
                    )));
                };
                fmt!(f, "(" lhs " " op " " rhs ")");
            }
            None => return Err(unmapped(f, self.func)),
        }
        Ok(())
    }
}

impl ToSql for stmt::BinaryOp {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        f.dst.push_str(&self.to_string());
        Ok(())
    }
}

/// An operand rendered with an explicit cast when the other side of the
/// comparison has a different declared type and the backend requires it.
struct Coerced<'a>(&'a Expr, Option<Type>);

impl ToSql for Coerced<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) -> Result<()> {
        match (self.0, self.1) {
            (Expr::Value(value), Some(ty))
                if f.capability().strict_types
                    && value.ty().is_some_and(|value_ty| value_ty != ty) =>
            {
                fmt!(f, &stmt::ExprCast {
                    expr: Box::new(Expr::Value(value.clone())),
                    ty,
                });
            }
            (expr, _) => fmt!(f, expr),
        }
        Ok(())
    }
}

fn declared_type(f: &Formatter<'_>, expr: &Expr) -> Option<Type> {
    match expr {
        Expr::Column(column) => f.scope().attribute_type(&column.name),
        Expr::Cast(cast) => Some(cast.ty),
        _ => None,
    }
}

pub(super) fn unmapped(f: &Formatter<'_>, func: CanonicalFn) -> Error {
    Error::expression_translation(format!(
        "{} has no mapping for {func:?}",
        f.capability().kind
    ))
}
