use super::Error;

/// The backend cannot be reached.
///
/// Raised when the backend's circuit breaker is open, or when retries of a
/// transient failure are exhausted. The engine reacts by trying the
/// configured fallback backend, if any.
#[derive(Debug)]
pub(super) struct BackendUnavailable {
    backend: Box<str>,
    reason: Box<str>,
}

impl std::error::Error for BackendUnavailable {}

impl core::fmt::Display for BackendUnavailable {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "backend `{}` unavailable: {}", self.backend, self.reason)
    }
}

impl Error {
    /// Creates a backend unavailable error.
    pub fn backend_unavailable(backend: impl core::fmt::Display, reason: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::BackendUnavailable(BackendUnavailable {
            backend: backend.to_string().into(),
            reason: reason.into().into(),
        }))
    }

    /// Returns `true` if this error is a backend unavailable error.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::BackendUnavailable(_))
    }
}
