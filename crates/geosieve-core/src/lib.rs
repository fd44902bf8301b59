pub mod driver;
pub use driver::{Connection, Driver};

mod error;
pub use error::{Error, IntoError};

mod fingerprint;
pub use fingerprint::Fingerprint;

pub mod schema;
pub use schema::Schema;

pub mod stmt;

/// A Result type alias that uses geosieve's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
