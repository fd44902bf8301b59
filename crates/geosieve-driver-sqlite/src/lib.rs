use geosieve_core::{
    async_trait,
    driver::{
        operation::{ExecSql, Operation, QuerySql, Ret},
        Capability, Driver, Response,
    },
    schema::Schema,
    stmt::RecordId,
    Error, Result,
};
use rusqlite::{Connection as RusqliteConnection, ErrorCode};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use url::Url;

/// Extension loaded into every connection unless disabled.
const SPATIALITE: &str = "mod_spatialite";

/// SQLite with the Spatialite extension.
#[derive(Debug, Clone)]
pub struct Sqlite {
    location: Location,

    /// Spatialite shared library, resolved by SQLite's loader. `None` skips
    /// loading, for databases that only need plain SQL.
    extension: Option<PathBuf>,
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Create a new SQLite driver with an arbitrary connection URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str)
            .map_err(|err| Error::invalid_request(format!("{err}; url={url_str}")))?;

        if url.scheme() != "sqlite" {
            return Err(Error::invalid_request(format!(
                "connection URL does not have a `sqlite` scheme; url={url_str}"
            )));
        }

        if url.path() == ":memory:" {
            Ok(Self::in_memory())
        } else {
            Ok(Self::open(url.path()))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Self {
        Self {
            location: Location::InMemory,
            extension: Some(SPATIALITE.into()),
        }
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            location: Location::File(path.as_ref().to_path_buf()),
            extension: Some(SPATIALITE.into()),
        }
    }

    /// Loads Spatialite from `path` instead of the default library name.
    pub fn extension(mut self, path: impl Into<PathBuf>) -> Self {
        self.extension = Some(path.into());
        self
    }

    pub fn without_spatialite(mut self) -> Self {
        self.extension = None;
        self
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn capability(&self) -> &'static Capability {
        &Capability::SPATIALITE
    }

    async fn connect(&self) -> Result<Box<dyn geosieve_core::Connection>> {
        let connection = match &self.location {
            Location::File(path) => Connection::open(path, self.extension.as_deref())?,
            Location::InMemory => Connection::in_memory(self.extension.as_deref())?,
        };
        Ok(Box::new(connection))
    }

    fn max_connections(&self) -> Option<usize> {
        // Every in-memory connection is a separate database
        matches!(self.location, Location::InMemory).then_some(1)
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
}

impl Connection {
    pub fn in_memory(extension: Option<&Path>) -> Result<Self> {
        let connection =
            RusqliteConnection::open_in_memory().map_err(driver_error)?;
        Self::init(connection, extension)
    }

    pub fn open<P: AsRef<Path>>(path: P, extension: Option<&Path>) -> Result<Self> {
        let connection =
            RusqliteConnection::open(path).map_err(driver_error)?;
        Self::init(connection, extension)
    }

    fn init(connection: RusqliteConnection, extension: Option<&Path>) -> Result<Self> {
        if let Some(extension) = extension {
            // SAFETY: the library is Spatialite, configured by the embedding
            // application; loading stays enabled only for this call.
            unsafe {
                connection
                    .load_extension_enable()
                    .map_err(driver_error)?;
                let loaded = connection.load_extension(extension, None::<&str>);
                connection
                    .load_extension_disable()
                    .map_err(driver_error)?;
                loaded.map_err(driver_error)?;
            }

            let initialized: bool = connection
                .query_row(
                    "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE name = 'spatial_ref_sys')",
                    [],
                    |row| row.get(0),
                )
                .map_err(driver_error)?;

            if !initialized {
                tracing::debug!("Initializing Spatialite metadata");
                connection
                    .execute_batch("SELECT InitSpatialMetadata(1);")
                    .map_err(driver_error)?;
            }
        }

        Ok(Self { connection })
    }
}

#[async_trait]
impl geosieve_core::Connection for Connection {
    fn capability(&self) -> &'static Capability {
        &Capability::SPATIALITE
    }

    async fn exec(&mut self, _schema: &Arc<Schema>, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(op) => self.query(op),
            Operation::ExecSql(op) => self.execute(op),
            op => Err(Error::invalid_request(format!(
                "SQLite does not support the `{}` operation",
                op.name()
            ))),
        }
    }

    async fn ping(&mut self) -> Result<()> {
        self.connection
            .query_row("SELECT 1", [], |_| Ok(()))
            .map_err(driver_error)
    }
}

impl Connection {
    fn query(&mut self, op: QuerySql) -> Result<Response> {
        let mut stmt = self
            .connection
            .prepare_cached(&op.sql)
            .map_err(driver_error)?;
        let mut rows = stmt.query([]).map_err(driver_error)?;

        match op.ret {
            Ret::Ids => {
                let mut ids = vec![];
                while let Some(row) = rows.next().map_err(driver_error)? {
                    let id: i64 = row.get(0).map_err(driver_error)?;
                    ids.push(RecordId(id));
                }
                Ok(Response::ids(ids))
            }
            Ret::Flags => {
                let mut flags = vec![];
                while let Some(row) = rows.next().map_err(driver_error)? {
                    let id: i64 = row.get(0).map_err(driver_error)?;
                    let matched: i64 = row.get(1).map_err(driver_error)?;
                    flags.push((RecordId(id), matched != 0));
                }
                Ok(Response::flags(flags))
            }
            Ret::Count => {
                let Some(row) = rows.next().map_err(driver_error)? else {
                    return Err(geosieve_core::err!("count query returned no rows"));
                };
                let count: i64 = row.get(0).map_err(driver_error)?;
                Ok(Response::count(count.max(0) as u64))
            }
        }
    }

    /// Runs each statement on its own inside one transaction. Spatialite's
    /// metadata functions return rows, so every statement goes through
    /// `execute_batch`.
    fn execute(&mut self, op: ExecSql) -> Result<Response> {
        self.connection
            .execute("BEGIN", [])
            .map_err(driver_error)?;

        for statement in &op.statements {
            tracing::trace!(sql = %statement, "Executing");
            if let Err(err) = self
                .connection
                .execute_batch(statement)
                .map_err(driver_error)
            {
                self.connection
                    .execute("ROLLBACK", [])
                    .map_err(driver_error)?;
                return Err(err);
            }
        }

        self.connection
            .execute("COMMIT", [])
            .map_err(driver_error)?;
        Ok(Response::count(op.statements.len() as u64))
    }
}

/// A locked or unreachable database file may free up; anything else SQLite
/// reports is about the statement and fails the same way every time.
fn driver_error(err: rusqlite::Error) -> Error {
    match err.sqlite_error_code() {
        Some(
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure,
        ) => Error::driver_connection_failed(err),
        _ => Error::driver_operation_failed(err),
    }
}
