use std::fmt;

/// The error type for fallible collection operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An index or range fell outside the bounds of a collection.
    IndexOutOfRange { index: usize, len: usize },
    /// An argument was rejected, such as a zero batch count or a capacity
    /// that cannot be allocated.
    IllegalArgument(&'static str),
    /// A mutation was attempted through a read-only view.
    UnsupportedOperation(&'static str),
    /// An iterator or cursor has no further elements.
    NoSuchElement,
    /// A scoped view was used after the call that granted it returned.
    UsageAfterScope,
    /// An operation was called in a state that does not permit it, such as
    /// removing through a cursor that has no current element.
    IllegalState(&'static str),
    /// Serialized input could not be decoded.
    MalformedInput(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Error::IllegalArgument(msg) => write!(f, "illegal argument: {msg}"),
            Error::UnsupportedOperation(op) => {
                write!(f, "unsupported operation `{op}` on a read-only view")
            }
            Error::NoSuchElement => write!(f, "no such element"),
            Error::UsageAfterScope => {
                write!(f, "scoped view used after its granting call returned")
            }
            Error::IllegalState(msg) => write!(f, "illegal state: {msg}"),
            Error::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
