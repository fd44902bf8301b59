use super::Error;

/// A materialized artifact no longer matches the data it was built from.
///
/// This never reaches callers: the artifact manager drops the stale artifact
/// and rebuilds it.
#[derive(Debug)]
pub(super) struct ArtifactStale {
    artifact: Box<str>,
    reason: Box<str>,
}

impl std::error::Error for ArtifactStale {}

impl core::fmt::Display for ArtifactStale {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "artifact `{}` is stale: {}", self.artifact, self.reason)
    }
}

impl Error {
    /// Creates an artifact stale error.
    pub fn artifact_stale(artifact: impl Into<String>, reason: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::ArtifactStale(ArtifactStale {
            artifact: artifact.into().into(),
            reason: reason.into().into(),
        }))
    }

    /// Returns `true` if this error is an artifact stale error.
    pub fn is_artifact_stale(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::ArtifactStale(_))
    }
}
