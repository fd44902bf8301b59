use geosieve::{
    driver::{
        operation::{ExecSql, QuerySql, Ret},
        Capability, Driver, Operation, Response,
    },
    stmt::RecordId,
    Error, Result, Schema,
};
use geosieve_core::{async_trait, Connection};

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};

/// A PostGIS stand-in that answers rendered SQL from a script instead of
/// running it, and keeps track of the materialized views it was asked to
/// create and drop.
#[derive(Debug, Clone)]
pub struct ScriptedSql {
    shared: Arc<Script>,
}

#[derive(Debug)]
struct Script {
    /// Answer to every `COUNT(*)`
    row_count: u64,

    /// Answer to every id query
    ids: Vec<RecordId>,

    views: Mutex<BTreeSet<String>>,
}

#[derive(Debug)]
pub struct ScriptedConnection {
    shared: Arc<Script>,
}

impl ScriptedSql {
    pub fn new(row_count: u64, ids: impl IntoIterator<Item = i64>) -> ScriptedSql {
        ScriptedSql {
            shared: Arc::new(Script {
                row_count,
                ids: ids.into_iter().map(RecordId).collect(),
                views: Mutex::default(),
            }),
        }
    }

    /// Views created and not dropped since.
    pub fn artifacts(&self) -> Vec<String> {
        self.shared.views.lock().unwrap().iter().cloned().collect()
    }
}

#[async_trait]
impl Driver for ScriptedSql {
    fn capability(&self) -> &'static Capability {
        &Capability::POSTGRESQL
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(ScriptedConnection {
            shared: self.shared.clone(),
        }))
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    fn capability(&self) -> &'static Capability {
        &Capability::POSTGRESQL
    }

    async fn exec(&mut self, _schema: &Arc<Schema>, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(QuerySql { ret, .. }) => Ok(match ret {
                Ret::Count => Response::count(self.shared.row_count),
                Ret::Ids => Response::ids(self.shared.ids.clone()),
                Ret::Flags => Response::flags(vec![]),
            }),
            Operation::ExecSql(ExecSql { statements }) => {
                let mut views = self.shared.views.lock().unwrap();
                for sql in &statements {
                    if let Some(name) = view_name(sql, "CREATE MATERIALIZED VIEW ") {
                        views.insert(name);
                    } else if let Some(name) = view_name(sql, "DROP MATERIALIZED VIEW IF EXISTS ") {
                        views.remove(&name);
                    }
                }
                Ok(Response::count(statements.len() as u64))
            }
            op => Err(Error::invalid_request(format!(
                "scripted SQL does not support `{}`",
                op.name()
            ))),
        }
    }

    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }
}

fn view_name(sql: &str, prefix: &str) -> Option<String> {
    let rest = sql.strip_prefix(prefix)?;
    let name = rest.split_whitespace().next()?;
    Some(name.trim_matches(|c| c == '"' || c == ';').to_string())
}
