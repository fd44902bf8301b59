use super::Error;

/// A request asked for a buffer distance different from the one already
/// baked into the dataset's artifact.
#[derive(Debug)]
pub(super) struct BufferStateConflict {
    dataset: Box<str>,
    baked: f64,
    requested: f64,
}

impl std::error::Error for BufferStateConflict {}

impl core::fmt::Display for BufferStateConflict {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "buffer state conflict on `{}`: baked {}, requested {}",
            self.dataset, self.baked, self.requested
        )
    }
}

impl Error {
    /// Creates a buffer state conflict error.
    pub fn buffer_state_conflict(dataset: impl core::fmt::Display, baked: f64, requested: f64) -> Error {
        Error::from(super::ErrorKind::BufferStateConflict(BufferStateConflict {
            dataset: dataset.to_string().into(),
            baked,
            requested,
        }))
    }

    /// Returns `true` if this error is a buffer state conflict.
    pub fn is_buffer_state_conflict(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::BufferStateConflict(_))
    }
}
