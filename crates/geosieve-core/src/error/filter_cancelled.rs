use super::Error;

#[derive(Debug)]
pub(super) struct FilterCancelled;

impl std::error::Error for FilterCancelled {}

impl core::fmt::Display for FilterCancelled {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("filter cancelled")
    }
}

impl Error {
    /// Creates a filter cancelled error.
    pub fn filter_cancelled() -> Error {
        Error::from(super::ErrorKind::FilterCancelled(FilterCancelled))
    }

    /// Returns `true` if the filter was cancelled.
    pub fn is_filter_cancelled(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::FilterCancelled(_))
    }
}
