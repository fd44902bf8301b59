use super::Error;

/// A filter expression has no safe rendering for the target backend.
///
/// For example: a canonical function the backend does not map, a raw SQL
/// fragment sent to a non-SQL backend, or a cast the dialect cannot express.
#[derive(Debug)]
pub(super) struct ExpressionTranslation {
    message: Box<str>,
}

impl std::error::Error for ExpressionTranslation {}

impl core::fmt::Display for ExpressionTranslation {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "expression translation failed: {}", self.message)
    }
}

impl Error {
    /// Creates an expression translation error.
    pub fn expression_translation(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::ExpressionTranslation(
            ExpressionTranslation {
                message: message.into().into(),
            },
        ))
    }

    /// Returns `true` if this error is an expression translation error.
    pub fn is_expression_translation(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::ExpressionTranslation(_))
    }
}
