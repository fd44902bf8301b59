mod exec_sql;
pub use exec_sql::ExecSql;

mod materialize;
pub use materialize::Materialize;

mod query_filter;
pub use query_filter::{QueryFilter, Scan};

mod query_sql;
pub use query_sql::{QuerySql, Ret};

mod release;
pub use release::Release;

mod stats;
pub use stats::Stats;

#[derive(Debug, Clone)]
pub enum Operation {
    /// Execute SQL statements that return nothing, such as artifact DDL
    ExecSql(ExecSql),

    /// Build an in-backend artifact holding a buffered reference geometry.
    /// Non-SQL backends only.
    Materialize(Materialize),

    /// Evaluate a structured filter. Non-SQL backends only.
    QueryFilter(QueryFilter),

    /// Execute a SQL query
    QuerySql(QuerySql),

    /// Drop an artifact. Non-SQL backends only.
    Release(Release),

    /// Count the rows of a dataset. Non-SQL backends only; SQL backends
    /// receive a `COUNT(*)` query.
    Stats(Stats),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ExecSql(_) => "exec_sql",
            Operation::Materialize(_) => "materialize",
            Operation::QueryFilter(_) => "query_filter",
            Operation::QuerySql(_) => "query_sql",
            Operation::Release(_) => "release",
            Operation::Stats(_) => "stats",
        }
    }
}
