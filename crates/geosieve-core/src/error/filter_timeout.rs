use super::Error;
use std::time::Duration;

/// The filter did not finish within its deadline.
#[derive(Debug)]
pub(super) struct FilterTimeout {
    elapsed: Duration,
}

impl std::error::Error for FilterTimeout {}

impl core::fmt::Display for FilterTimeout {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "filter timed out after {:?}", self.elapsed)
    }
}

impl Error {
    /// Creates a filter timeout error.
    pub fn filter_timeout(elapsed: Duration) -> Error {
        Error::from(super::ErrorKind::FilterTimeout(FilterTimeout { elapsed }))
    }

    /// Returns `true` if this error is a filter timeout.
    pub fn is_filter_timeout(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::FilterTimeout(_))
    }
}
