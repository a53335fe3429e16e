use std::io;

use http::StatusCode;
use thiserror::Error;

use crate::kind::ContentKind;

/// Boxed error type used at the body-stream boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single decode operation.
///
/// Errors propagate unmodified to the caller; the middleware never retries
/// and never recovers locally. [`BodyError::status_code`] is the suggested
/// transport mapping for callers that turn failures into responses.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("{kind} body exceeds the configured limit of {limit} bytes")]
    PayloadTooLarge { kind: ContentKind, limit: u64 },

    #[error("malformed {kind} body: {reason}")]
    Malformed { kind: ContentKind, reason: String },

    #[error("unsupported body encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("multipart stream error: {source}")]
    Multipart {
        #[from]
        source: multer::Error,
    },

    #[error("request body stream error: {reason}")]
    Stream { reason: String },

    #[error("io error while spooling upload: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("request body has already been consumed")]
    BodyConsumed,
}

impl BodyError {
    pub fn malformed<S: ToString>(kind: ContentKind, reason: S) -> Self {
        Self::Malformed { kind, reason: reason.to_string() }
    }

    pub fn stream<S: ToString>(reason: S) -> Self {
        Self::Stream { reason: reason.to_string() }
    }

    /// Whether the failure was a body exceeding a configured size limit.
    pub fn is_payload_too_large(&self) -> bool {
        match self {
            Self::PayloadTooLarge { .. } => true,
            Self::Multipart { source } => matches!(
                source,
                multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. }
            ),
            _ => false,
        }
    }

    /// Transport status this failure maps to.
    pub fn status_code(&self) -> StatusCode {
        if self.is_payload_too_large() {
            return StatusCode::PAYLOAD_TOO_LARGE;
        }
        match self {
            Self::UnsupportedEncoding(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
