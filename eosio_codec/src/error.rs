//! Error type shared by every encoding and decoding operation of the crate.
use std::fmt;

/// Result of decoding (or fallibly encoding) a value.
pub type ParseResult<T> = Result<T, CodecError>;

/// Errors that can occur when producing or consuming the wire format.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("required [{required}] bytes, remaining [{remaining}]")]
    InsufficientData { required: usize, remaining: usize },
    #[error("malformed varint: no terminating byte or value overflows")]
    MalformedVarint,
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("checksum mismatch: expected {}, found {}", hex::encode(expected), hex::encode(actual))]
    ChecksumMismatch { expected: [u8; 4], actual: [u8; 4] },
    #[error("field [{field}] has unknown type [{type_name}]")]
    UnknownType { field: String, type_name: String },
    #[error("missing required field [{0}]")]
    MissingRequiredField(String),
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
    #[error("schema resolution failed: {0}")]
    SchemaResolution(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("malformed base58 string: {0}")]
    Base58(#[from] bs58::decode::Error),
    #[error("elliptic curve operation failed: {0}")]
    Crypto(#[from] secp256k1::Error),
    #[error("zlib stream: {0}")]
    Compression(#[from] std::io::Error),
    #[error("{path}: {source}")]
    Context {
        path:   String,
        #[source]
        source: Box<CodecError>,
    },
}

impl CodecError {
    /// Shorthand for an [`InvalidValue`](CodecError::InvalidValue) error.
    pub fn invalid(msg: impl fmt::Display) -> Self { CodecError::InvalidValue(msg.to_string()) }

    /// Shorthand for a [`SchemaResolution`](CodecError::SchemaResolution)
    /// error.
    pub fn schema(msg: impl fmt::Display) -> Self { CodecError::SchemaResolution(msg.to_string()) }

    /// Wrap the error with one more breadcrumb.
    pub fn context(self, path: impl Into<String>) -> Self {
        CodecError::Context {
            path:   path.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, i.e., the one that caused the failure, with all
    /// breadcrumbs removed.
    pub fn root(&self) -> &CodecError {
        let mut current = self;
        while let CodecError::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// The breadcrumb trail, outermost first.
    pub fn path(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut current = self;
        while let CodecError::Context { path, source } = current {
            out.push(path.as_str());
            current = source;
        }
        out
    }
}

impl From<std::string::FromUtf8Error> for CodecError {
    fn from(e: std::string::FromUtf8Error) -> Self { CodecError::invalid(e) }
}

impl From<hex::FromHexError> for CodecError {
    fn from(e: hex::FromHexError) -> Self { CodecError::invalid(format!("bad hex: {}", e)) }
}

/// Attach breadcrumbs to results, analogous to `anyhow::Context`.
pub trait ResultExt<T> {
    /// Wrap the error, if any, computing the breadcrumb lazily.
    fn context_with<S: Into<String>>(self, f: impl FnOnce() -> S) -> ParseResult<T>;
}

impl<T> ResultExt<T> for ParseResult<T> {
    #[inline]
    fn context_with<S: Into<String>>(self, f: impl FnOnce() -> S) -> ParseResult<T> {
        self.map_err(|e| e.context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breadcrumb_display() {
        let err = CodecError::InsufficientData {
            required:  8,
            remaining: 3,
        }
        .context("decode field [amount] of type [int64]")
        .context("decode field [quantity] of type [asset]");
        assert_eq!(
            err.to_string(),
            "decode field [quantity] of type [asset]: decode field [amount] of type [int64]: \
             required [8] bytes, remaining [3]"
        );
        assert!(
            matches!(err.root(), CodecError::InsufficientData {
                required:  8,
                remaining: 3,
            }),
            "The root error should be preserved through breadcrumbs."
        );
        assert_eq!(err.path(), vec![
            "decode field [quantity] of type [asset]",
            "decode field [amount] of type [int64]"
        ]);
    }
}
