use super::Expr;

use serde::{Deserialize, Serialize};

/// An attribute of the dataset being filtered. Inside a reference dataset's
/// filter, an attribute of the reference dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExprColumn {
    pub name: String,
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        ExprColumn { name: name.into() }.into()
    }
}

impl From<ExprColumn> for Expr {
    fn from(value: ExprColumn) -> Self {
        Self::Column(value)
    }
}
