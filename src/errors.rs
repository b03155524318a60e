//! Error types.

use alloc::string::String;

/// Alias for [`core::result::Result`] with the `rsa-keyblob` crate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The input is not a well-formed encoding of the expected key layout:
    /// truncated data, a length running past the input or the configured
    /// cap, an unexpected tag, element count, version, OID or magic number.
    #[error("malformed key data: {reason}")]
    Format {
        /// What was wrong with the input.
        reason: String,
    },

    /// An unknown key blob identifier, or a formatter asked for a kind of key
    /// its layout cannot carry.
    #[error("not supported: {reason}")]
    NotSupported {
        /// What was requested.
        reason: String,
    },

    /// A required key component is missing, or the caller asked for private
    /// key material that is not present.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Which argument was rejected.
        reason: String,
    },
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::Format {
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Error::NotSupported {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`Error::Format`].
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format { .. })
    }

    /// Returns `true` for [`Error::NotSupported`].
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Error::NotSupported { .. })
    }

    /// Returns `true` for [`Error::InvalidArgument`].
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }
}

#[cfg(feature = "pem")]
impl From<pem_rfc7468::Error> for Error {
    fn from(err: pem_rfc7468::Error) -> Self {
        Error::malformed(format!("PEM: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = Error::malformed("unexpected element count 3");
        assert_eq!(
            err.to_string(),
            "malformed key data: unexpected element count 3"
        );
        assert!(err.is_format());
        assert!(!err.is_not_supported());

        let err = Error::unsupported("unknown key blob type `Foo`");
        assert_eq!(err.to_string(), "not supported: unknown key blob type `Foo`");
        assert!(err.is_not_supported());

        let err = Error::invalid_argument("missing modulus");
        assert!(err.is_invalid_argument());
    }
}
