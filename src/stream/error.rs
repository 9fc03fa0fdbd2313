use std::{fmt, io};
use thiserror::Error;

/// Invalid size or part configuration, detected before any network call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("object size {0} is negative")]
    NegativeSize(i64),

    #[error("object size {size} exceeds the maximum object size of {max} bytes")]
    ObjectTooLarge { size: u64, max: u64 },

    #[error("part size {size} is smaller than the allowed minimum of {min} bytes")]
    PartSizeTooSmall { size: u64, min: u64 },

    #[error("part size {size} is bigger than the allowed maximum of {max} bytes")]
    PartSizeTooLarge { size: u64, max: u64 },

    #[error("part size {part_size} * {max_parts} parts is less than the object size {size}")]
    PartSizeTooSmallForObject {
        part_size: u64,
        max_parts: usize,
        size: u64,
    },

    #[error("stream exceeded the maximum of {0} parts")]
    TooManyParts(u16),
}

/// Failure reported by the remote store or the network.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub status: Option<u16>,
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

impl TransportError {
    #[must_use]
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            status: None,
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Permission denied class errors, multipart uploads may be disallowed
    /// while a plain PUT is still accepted.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        self.code == "AccessDenied"
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = self.status {
            write!(f, "[{status}] ")?;
        }

        write!(f, "{}: {}", self.code, self.message)?;

        if let Some(rid) = &self.request_id {
            write!(f, " (request id: {rid})")?;
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("could not initiate multipart upload: {0}")]
    SessionCreateFailed(#[source] TransportError),

    #[error("could not upload part {part_number}: {source}")]
    PartFailed {
        part_number: u16,
        #[source]
        source: TransportError,
    },

    #[error("could not complete multipart upload: {0}")]
    CompletionFailed(#[source] TransportError),

    #[error("could not upload object: {0}")]
    PutFailed(#[source] TransportError),

    #[error("uploaded {uploaded} bytes, expected {expected}")]
    SizeMismatch { expected: u64, uploaded: u64 },

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("missing part number {0}")]
    MissingPart(u16),

    #[error("upload session {0} is already closed")]
    SessionClosed(String),

    #[error("could not read the source: {0}")]
    Io(#[from] io::Error),

    #[error("upload canceled")]
    Canceled,
}

impl UploadError {
    /// The transport error behind this failure, if any.
    #[must_use]
    pub const fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::SessionCreateFailed(e)
            | Self::PartFailed { source: e, .. }
            | Self::CompletionFailed(e)
            | Self::PutFailed(e) => Some(e),
            _ => None,
        }
    }
}
