//! Unified error type.

use std::fmt;

/// The error type returned by reqlog's fallible operations.
///
/// Every variant is a configuration problem, reported once when the
/// [`Logger`](crate::Logger) is built. Nothing fails at request time: errors
/// raised by the wrapped service pass through untouched and are never
/// converted into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The format template could not be compiled.
    Template {
        /// Byte offset of the offending placeholder in the template.
        offset: usize,
        reason: &'static str,
    },
    /// Neither an existing logger nor an output stream was configured.
    MissingOutput,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template { offset, reason } => {
                write!(f, "template: {reason} at byte {offset}")
            }
            Self::MissingOutput => f.write_str("no logger or output stream configured"),
        }
    }
}

impl std::error::Error for Error {}
