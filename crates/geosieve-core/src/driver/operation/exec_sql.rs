use super::Operation;

#[derive(Debug, Clone)]
pub struct ExecSql {
    /// Statements run in order. On backends with transactional DDL they run
    /// as one transaction.
    pub statements: Vec<String>,
}

impl From<ExecSql> for Operation {
    fn from(value: ExecSql) -> Self {
        Self::ExecSql(value)
    }
}
