use std::collections::HashMap;

use tokio_postgres::{Client, Error, Statement};

/// Maximum number of prepared statements kept per connection.
const CAPACITY: usize = 256;

/// Prepared statements of one connection, keyed by query text.
#[derive(Debug, Clone, Default)]
pub struct StatementCache {
    map: HashMap<String, Statement>,
}

impl StatementCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, query: &str) -> Option<Statement> {
        self.map.get(query).map(ToOwned::to_owned)
    }

    pub fn insert(&mut self, query: &str, statement: Statement) {
        // Keyset chunk queries embed their cursor, so most texts are seen once
        if self.map.len() >= CAPACITY {
            self.map.clear();
        }
        self.map.insert(query.to_string(), statement);
    }

    pub async fn prepare(&mut self, client: &Client, query: &str) -> Result<Statement, Error> {
        if let Some(statement) = self.get(query) {
            Ok(statement)
        } else {
            let stmt = client.prepare(query).await?;
            self.insert(query, stmt.clone());
            Ok(stmt)
        }
    }

    /// Forgets every statement. Called after DDL, which can invalidate
    /// plans of statements that referenced a dropped artifact.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}
