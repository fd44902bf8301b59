use super::Error;

#[derive(Debug)]
pub(super) struct UnsupportedBackend {
    name: Box<str>,
}

impl std::error::Error for UnsupportedBackend {}

impl core::fmt::Display for UnsupportedBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unsupported backend: {}", self.name)
    }
}

impl Error {
    /// Creates an unsupported backend error.
    ///
    /// Returned when a backend kind is not known to the capability registry.
    pub fn unsupported_backend(name: impl core::fmt::Display) -> Error {
        Error::from(super::ErrorKind::UnsupportedBackend(UnsupportedBackend {
            name: name.to_string().into(),
        }))
    }

    /// Returns `true` if this error is an unsupported backend error.
    pub fn is_unsupported_backend(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::UnsupportedBackend(_))
    }
}
