use super::Operation;

#[derive(Debug, Clone)]
pub struct QuerySql {
    /// The SQL query to execute
    pub sql: String,

    /// Shape of the result rows
    pub ret: Ret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ret {
    /// One integer id column
    Ids,

    /// An integer id column and a 0/1 match column
    Flags,

    /// A single integer count
    Count,
}

impl From<QuerySql> for Operation {
    fn from(value: QuerySql) -> Self {
        Self::QuerySql(value)
    }
}
