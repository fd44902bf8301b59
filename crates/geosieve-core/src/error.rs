mod adhoc;
mod artifact_stale;
mod backend_unavailable;
mod buffer_state_conflict;
mod connection_pool;
mod driver_operation_failed;
mod expression_translation;
mod filter_cancelled;
mod filter_timeout;
mod invalid_geometry;
mod invalid_request;
mod unsupported_backend;

use adhoc::AdhocError;
use artifact_stale::ArtifactStale;
use backend_unavailable::BackendUnavailable;
use buffer_state_conflict::BufferStateConflict;
use connection_pool::ConnectionPoolError;
use driver_operation_failed::DriverOperationFailed;
use expression_translation::ExpressionTranslation;
use filter_cancelled::FilterCancelled;
use filter_timeout::FilterTimeout;
use invalid_geometry::InvalidGeometry;
use invalid_request::InvalidRequest;
use std::sync::Arc;
use unsupported_backend::UnsupportedBackend;

/// Returns early with an ad-hoc [`Error`](crate::Error) built from a format
/// string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Builds an ad-hoc [`Error`](crate::Error) from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error that can occur while filtering.
///
/// `Error` is a single pointer wide and cheap to clone, so the same failure
/// can be stored on a task handle and returned to every waiter.
#[derive(Clone)]
pub struct Error {
    inner: Option<Arc<ErrorInner>>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

impl Error {
    /// Adds context to this error.
    ///
    /// Context is displayed in reverse order: the most recently added context
    /// is shown first, ending with the root cause.
    #[inline(always)]
    pub fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let kind = match consequent.inner {
            Some(inner) => match Arc::try_unwrap(inner) {
                Ok(inner) => {
                    assert!(
                        inner.cause.is_none(),
                        "consequent error must not already have a cause"
                    );
                    inner.kind
                }
                Err(shared) => ErrorKind::Adhoc(AdhocError::new(shared.kind.to_string())),
            },
            None => ErrorKind::Unknown,
        };

        Error {
            inner: Some(Arc::new(ErrorInner {
                kind,
                cause: Some(self),
            })),
        }
    }

    /// Builds an ad-hoc error from format arguments. Used by [`err!`] and
    /// [`bail!`].
    pub fn from_args(args: core::fmt::Arguments<'_>) -> Error {
        Error::from(ErrorKind::Adhoc(AdhocError::from_args(args)))
    }

    /// Returns `true` for failures worth retrying against the same backend:
    /// pool exhaustion and driver failures the driver tagged as transient.
    pub fn is_transient(&self) -> bool {
        self.chain().any(|err| match err.kind() {
            ErrorKind::DriverOperationFailed(err) => err.transient,
            ErrorKind::ConnectionPool(_) => true,
            _ => false,
        })
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = self;
        core::iter::once(err).chain(core::iter::from_fn(move || {
            err = err.inner.as_ref().and_then(|inner| inner.cause.as_ref())?;
            Some(err)
        }))
    }

    fn kind(&self) -> &ErrorKind {
        self.inner
            .as_ref()
            .map(|inner| &inner.kind)
            .unwrap_or(&ErrorKind::Unknown)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::DriverOperationFailed(err) => Some(err),
            ErrorKind::ConnectionPool(err) => Some(err),
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(err.kind(), f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if !f.alternate() {
            core::fmt::Display::fmt(self, f)
        } else {
            let Some(ref inner) = self.inner else {
                return f.debug_struct("Error").field("kind", &"None").finish();
            };
            f.debug_struct("Error")
                .field("kind", &inner.kind)
                .field("cause", &inner.cause)
                .finish()
        }
    }
}

#[derive(Debug)]
enum ErrorKind {
    Anyhow(anyhow::Error),
    Adhoc(AdhocError),
    ArtifactStale(ArtifactStale),
    BackendUnavailable(BackendUnavailable),
    BufferStateConflict(BufferStateConflict),
    ConnectionPool(ConnectionPoolError),
    DriverOperationFailed(DriverOperationFailed),
    ExpressionTranslation(ExpressionTranslation),
    FilterCancelled(FilterCancelled),
    FilterTimeout(FilterTimeout),
    InvalidGeometry(InvalidGeometry),
    InvalidRequest(InvalidRequest),
    UnsupportedBackend(UnsupportedBackend),
    Unknown,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self {
            Anyhow(err) => core::fmt::Display::fmt(err, f),
            Adhoc(err) => core::fmt::Display::fmt(err, f),
            ArtifactStale(err) => core::fmt::Display::fmt(err, f),
            BackendUnavailable(err) => core::fmt::Display::fmt(err, f),
            BufferStateConflict(err) => core::fmt::Display::fmt(err, f),
            ConnectionPool(err) => core::fmt::Display::fmt(err, f),
            DriverOperationFailed(err) => core::fmt::Display::fmt(err, f),
            ExpressionTranslation(err) => core::fmt::Display::fmt(err, f),
            FilterCancelled(err) => core::fmt::Display::fmt(err, f),
            FilterTimeout(err) => core::fmt::Display::fmt(err, f),
            InvalidGeometry(err) => core::fmt::Display::fmt(err, f),
            InvalidRequest(err) => core::fmt::Display::fmt(err, f),
            UnsupportedBackend(err) => core::fmt::Display::fmt(err, f),
            Unknown => f.write_str("unknown geosieve error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Some(Arc::new(ErrorInner { kind, cause: None })),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

/// Trait for types that can be converted into an Error.
pub trait IntoError {
    /// Converts this type into an Error.
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    #[inline(always)]
    fn into_error(self) -> Error {
        self
    }
}
