#[macro_use]
mod macros;

mod exec_log;
pub use exec_log::ExecLog;

pub mod fixtures;

mod logging_driver;
pub use logging_driver::{DriverHandle, DriverOp, LoggingDriver};

mod scripted_sql;
pub use scripted_sql::ScriptedSql;

mod world;
pub use world::{memory_for, World};

pub use geosieve::BackendKind;
