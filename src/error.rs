use thiserror::Error;

use crate::ua;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of failure produced by a core operation.
///
/// This mirrors the status-code families the OPC UA wire protocol distinguishes, without tying
/// the core to the exact numeric values the standard assigns (those live in [`ua::StatusCode`]).
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A node, reference, or namespace lookup found nothing.
    LookupMiss,
    /// A node id or repeated-job id that must be fresh was already taken.
    AlreadyExists,
    /// A written value's type does not match the variable's declared data type.
    TypeMismatch,
    /// A numeric range was invalid for the target value (e.g. a range against a scalar).
    RangeInvalid,
    /// The operation is recognized but not implemented by this store.
    NotSupported,
    /// The attribute is structurally immutable and can never be written.
    NotWritable,
    /// An argument (e.g. a method input) failed validation.
    ArgumentInvalid,
    /// An invariant the store relies on was found broken; the caller should treat this as fatal.
    InternalInvariantBroken,
    /// A network layer or channel-level operation failed.
    TransportFailure,
    /// A session could not be authenticated under the configured login policy.
    AuthFailure,
}

/// Error produced by a core operation.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn lookup_miss(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LookupMiss, message)
    }

    #[must_use]
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    #[must_use]
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    #[must_use]
    pub fn range_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeInvalid, message)
    }

    #[must_use]
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotSupported, message)
    }

    #[must_use]
    pub fn not_writable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotWritable, message)
    }

    #[must_use]
    pub fn argument_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArgumentInvalid, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalInvariantBroken, message)
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportFailure, message)
    }

    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthFailure, message)
    }
}

/// Converts an error into the status code reported to the wire, so service glue never has to
/// match on [`ErrorKind`] by hand to fill a result slot.
impl From<&Error> for ua::StatusCode {
    fn from(err: &Error) -> Self {
        match err.kind {
            ErrorKind::LookupMiss => ua::StatusCode::BAD_NODE_ID_UNKNOWN,
            ErrorKind::AlreadyExists => ua::StatusCode::BAD_NODE_ID_EXISTS,
            ErrorKind::TypeMismatch => ua::StatusCode::BAD_TYPE_MISMATCH,
            ErrorKind::RangeInvalid => ua::StatusCode::BAD_INDEX_RANGE_INVALID,
            ErrorKind::NotSupported => ua::StatusCode::BAD_NOT_SUPPORTED,
            ErrorKind::NotWritable => ua::StatusCode::BAD_NOT_WRITABLE,
            ErrorKind::ArgumentInvalid => ua::StatusCode::BAD_INVALID_ARGUMENT,
            ErrorKind::InternalInvariantBroken => ua::StatusCode::BAD_INTERNAL_ERROR,
            ErrorKind::TransportFailure => ua::StatusCode::BAD_COMMUNICATION_ERROR,
            ErrorKind::AuthFailure => ua::StatusCode::BAD_USER_ACCESS_DENIED,
        }
    }
}

impl From<Error> for ua::StatusCode {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}
