use thiserror::Error;

/// Errors returned by the pattern reader and the header/point decoders.
///
/// # Examples
/// ```
/// use toypat_core::FormatError;
///
/// let err = FormatError::StrideViolation {
///     group: "1".to_string(),
///     expected: 2,
///     actual: 1,
/// };
/// assert!(err.to_string().contains("expected 2 points, got 1"));
/// ```
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected end of input: {context}")]
    UnexpectedEof { context: &'static str },
    #[error("invalid {field} value {value:?}: {reason}")]
    InvalidHeaderField {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("unsupported version {value}")]
    UnsupportedVersion { value: i64 },
    #[error("invalid point {token:?}: {reason}")]
    InvalidPoint { token: String, reason: String },
    #[error("group {group:?}: expected {expected} points, got {actual}")]
    StrideViolation {
        group: String,
        expected: usize,
        actual: usize,
    },
}

impl FormatError {
    /// True for failures of the byte source itself rather than of its content.
    pub fn is_transport(&self) -> bool {
        matches!(self, FormatError::Io(_) | FormatError::UnexpectedEof { .. })
    }
}

pub(crate) fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
