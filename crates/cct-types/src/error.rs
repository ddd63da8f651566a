use std::fmt;

use thiserror::Error;

/// Failure class of an error, independent of the crate that raised it.
///
/// Every `cct-*` error enum maps onto one of these so that callers can turn
/// any failure into a response status without matching on crate-specific
/// variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input: empty key, unregistered type, malformed argument.
    Validation,
    /// Something that must exist does not (history, asset, reference).
    NotFound,
    /// The write would violate uniqueness or an existing reference.
    Conflict,
    /// An underlying ledger accessor failed.
    Storage,
    /// An invariant was broken inside the framework itself.
    Internal,
}

impl ErrorKind {
    /// Response status carried by errors of this kind.
    ///
    /// Storage failures are reported with a 4xx status: they are not assumed
    /// to be transient and nothing in the core retries them.
    pub const fn status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Storage => 400,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::Storage => "storage",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Errors produced while building or validating model values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("unknown asset type: {0}")]
    UnknownAssetType(String),

    #[error("asset type '{asset_type}' is missing required property '{prop}'")]
    MissingProperty { asset_type: String, prop: String },

    #[error("asset type '{asset_type}' has no property '{prop}'")]
    UnknownProperty { asset_type: String, prop: String },

    #[error("invalid value for '{prop}': {reason}")]
    InvalidValue { prop: String, reason: String },

    #[error("invalid data type: {0}")]
    InvalidDataType(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TypeError {
    pub fn invalid_value(prop: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            prop: prop.into(),
            reason: reason.into(),
        }
    }

    /// All type errors are input problems.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(ErrorKind::Validation.status(), 400);
        assert_eq!(ErrorKind::NotFound.status(), 404);
        assert_eq!(ErrorKind::Conflict.status(), 409);
        assert_eq!(ErrorKind::Storage.status(), 400);
        assert_eq!(ErrorKind::Internal.status(), 500);
    }

    #[test]
    fn type_errors_are_validation() {
        let err = TypeError::UnknownAssetType("ghost".into());
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "unknown asset type: ghost");
    }
}
