use super::Expr;
use crate::driver::CanonicalFn;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprFunc {
    pub func: CanonicalFn,
    pub args: Vec<Expr>,
}

impl Expr {
    pub fn func(func: CanonicalFn, args: impl IntoIterator<Item = Expr>) -> Self {
        ExprFunc {
            func,
            args: args.into_iter().collect(),
        }
        .into()
    }
}

impl From<ExprFunc> for Expr {
    fn from(value: ExprFunc) -> Self {
        Self::Func(value)
    }
}
