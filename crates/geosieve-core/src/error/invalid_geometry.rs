use super::Error;

/// Reference geometry text could not be parsed.
#[derive(Debug)]
pub(super) struct InvalidGeometry {
    message: Box<str>,
}

impl std::error::Error for InvalidGeometry {}

impl core::fmt::Display for InvalidGeometry {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid geometry: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid geometry error.
    pub fn invalid_geometry(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidGeometry(InvalidGeometry {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid geometry error.
    pub fn is_invalid_geometry(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::InvalidGeometry(_))
    }
}
