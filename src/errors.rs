use std::fmt;

/// Errors raised by the k-point converters.
///
/// Both kinds indicate a data-contract violation by the caller and are not
/// retryable; no partial result is returned alongside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KpointError {
    /// An operation expecting mesh-shaped input received something without
    /// mesh structure, or a documented precondition was violated
    /// (fewer than two labels, non-positive spacing).
    InvalidInput(String),
    /// An explicit k-point list cannot be losslessly represented as a
    /// regular mesh.
    Conversion(String),
}

impl fmt::Display for KpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpointError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            KpointError::Conversion(msg) => write!(f, "conversion failed: {}", msg),
        }
    }
}

impl std::error::Error for KpointError {}
