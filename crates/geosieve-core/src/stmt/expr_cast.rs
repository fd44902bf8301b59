use super::{Expr, Type};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprCast {
    pub expr: Box<Expr>,
    pub ty: Type,
}

impl Expr {
    pub fn cast(expr: impl Into<Self>, ty: Type) -> Self {
        ExprCast {
            expr: Box::new(expr.into()),
            ty,
        }
        .into()
    }
}

impl From<ExprCast> for Expr {
    fn from(value: ExprCast) -> Self {
        Self::Cast(value)
    }
}
