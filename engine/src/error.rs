//! Error types and status codes for the aerokv engine.

use crate::{BinName, Generation};
use std::fmt;
use thiserror::Error;

/// Flat status enumeration surfaced to callers. `Ok` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    ErrClient,
    ErrParam,
    ErrRecordNotFound,
    ErrRecordGeneration,
    ErrRecordExists,
    ErrBinIncompatibleType,
    /// Reserved wire code; missing bins read as absent rather than failing.
    ErrBinNotFound,
    ErrNamespaceNotFound,
    ErrFailElementNotFound,
    ErrFailElementExists,
    ErrOpNotApplicable,
    ErrGeoInvalidGeoJson,
}

impl Status {
    /// Numeric code as seen on the wire.
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::ErrClient => -1,
            Status::ErrParam => -2,
            Status::ErrRecordNotFound => 2,
            Status::ErrRecordGeneration => 3,
            Status::ErrRecordExists => 5,
            Status::ErrBinIncompatibleType => 12,
            Status::ErrBinNotFound => 17,
            Status::ErrNamespaceNotFound => 20,
            Status::ErrFailElementNotFound => 23,
            Status::ErrFailElementExists => 24,
            Status::ErrOpNotApplicable => 26,
            Status::ErrGeoInvalidGeoJson => 160,
        }
    }

    /// Symbolic name, e.g. `ERR_PARAM`.
    pub fn name(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::ErrClient => "ERR_CLIENT",
            Status::ErrParam => "ERR_PARAM",
            Status::ErrRecordNotFound => "ERR_RECORD_NOT_FOUND",
            Status::ErrRecordGeneration => "ERR_RECORD_GENERATION",
            Status::ErrRecordExists => "ERR_RECORD_EXISTS",
            Status::ErrBinIncompatibleType => "ERR_BIN_INCOMPATIBLE_TYPE",
            Status::ErrBinNotFound => "ERR_BIN_NOT_FOUND",
            Status::ErrNamespaceNotFound => "ERR_NAMESPACE_NOT_FOUND",
            Status::ErrFailElementNotFound => "ERR_FAIL_NOT_FOUND",
            Status::ErrFailElementExists => "ERR_FAIL_ELEMENT_EXISTS",
            Status::ErrOpNotApplicable => "ERR_OP_NOT_APPLICABLE",
            Status::ErrGeoInvalidGeoJson => "ERR_GEO_INVALID_GEOJSON",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All possible errors from the aerokv engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Parameter errors, always raised before any mutation
    #[error("invalid parameter: {0}")]
    Param(String),

    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    // Type errors
    #[error("bin '{bin}' holds {actual}, operation requires {expected}")]
    BinIncompatibleType {
        bin: BinName,
        expected: &'static str,
        actual: &'static str,
    },

    // Not found
    #[error("record not found")]
    RecordNotFound,

    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    // Conflicts
    #[error("record already exists")]
    RecordExists,

    #[error("generation mismatch: expected {expected}, got {actual}")]
    GenerationMismatch {
        expected: Generation,
        actual: Generation,
    },

    // Value errors
    #[error("operation not applicable: {0}")]
    NotApplicable(String),

    // Collection write-flag rejections
    #[error("element already exists: {0}")]
    ElementExists(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    // Codec
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("invalid geojson: {0}")]
    InvalidGeoJson(String),
}

impl Error {
    /// Status code this error surfaces as.
    pub fn status(&self) -> Status {
        match self {
            Error::Param(_) | Error::IndexOutOfRange { .. } => Status::ErrParam,
            Error::BinIncompatibleType { .. } => Status::ErrBinIncompatibleType,
            Error::RecordNotFound => Status::ErrRecordNotFound,
            Error::NamespaceNotFound(_) => Status::ErrNamespaceNotFound,
            Error::RecordExists => Status::ErrRecordExists,
            Error::GenerationMismatch { .. } => Status::ErrRecordGeneration,
            Error::NotApplicable(_) => Status::ErrOpNotApplicable,
            Error::ElementExists(_) => Status::ErrFailElementExists,
            Error::ElementNotFound(_) => Status::ErrFailElementNotFound,
            Error::Serialization(_) => Status::ErrClient,
            Error::InvalidGeoJson(_) => Status::ErrGeoInvalidGeoJson,
        }
    }

    pub fn param(msg: impl Into<String>) -> Self {
        Error::Param(msg.into())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::Param("bin name too long".into());
        assert_eq!(err.to_string(), "invalid parameter: bin name too long");

        let err = Error::GenerationMismatch {
            expected: 1,
            actual: 2,
        };
        assert_eq!(err.to_string(), "generation mismatch: expected 1, got 2");

        let err = Error::BinIncompatibleType {
            bin: "tags".into(),
            expected: "list",
            actual: "integer",
        };
        assert_eq!(
            err.to_string(),
            "bin 'tags' holds integer, operation requires list"
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Error::param("x").status(), Status::ErrParam);
        assert_eq!(
            Error::IndexOutOfRange { index: 4, len: 2 }.status().code(),
            -2
        );
        assert_eq!(Error::RecordExists.status().code(), 5);
        assert_eq!(Error::RecordNotFound.status().name(), "ERR_RECORD_NOT_FOUND");
        assert_eq!(Status::ErrBinIncompatibleType.to_string(), "ERR_BIN_INCOMPATIBLE_TYPE");
    }
}
