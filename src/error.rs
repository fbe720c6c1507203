//! Error types for EDS operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building, validating, or delivering a message.
#[derive(Debug, Error)]
pub enum Error {
    /// Message data violates a required invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An attachment could not be created from its source file.
    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    /// The delivery service or the transport reported a failure.
    #[error(transparent)]
    MailService(#[from] MailServiceError),

    /// Building the underlying HTTP client failed.
    #[error("HTTP client error: {0}")]
    Request(#[from] reqwest::Error),

    /// Message serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` for errors raised before any request is made.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Returns `true` for attachment construction errors.
    pub fn is_attachment(&self) -> bool {
        matches!(self, Error::Attachment(_))
    }

    /// Returns `true` for failures reported by the service or transport.
    pub fn is_mail_service(&self) -> bool {
        matches!(self, Error::MailService(_))
    }
}

/// Invalid message data. Fix the input and try again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The address does not look like an email address.
    #[error("address [{0}] is not valid for transport")]
    InvalidAddress(String),

    /// A field required for delivery is empty.
    #[error("the required field [{0}] is not present on the mail object")]
    MissingField(&'static str),
}

/// Failure to turn a local file into an attachment.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// No path was given.
    #[error("the attachment path cannot be empty")]
    EmptyPath,

    /// Nothing exists at the path.
    #[error("cannot attach file [{}]: no such file", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("cannot read attachment [{}]: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was declared as base64 but does not decode.
    #[error("attachment [{}] is not valid base64", .0.display())]
    InvalidBase64(PathBuf),

    /// Encoding produced no content.
    #[error("error processing attachment [{}]: empty content", .0.display())]
    Empty(PathBuf),
}

/// A failure reported while talking to the delivery service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailServiceError {
    /// The request never got a usable answer (connection, TLS, timeout).
    #[error("unable to transport mail [{0}]")]
    Transport(String),

    /// HTTP 404: unknown route or application key.
    #[error("request not found, check application key")]
    NotFound,

    /// EDS answered `REJECTED`; carries the rejection reason.
    #[error("message was rejected: [{0}]")]
    Rejected(String),

    /// The response matched none of the known shapes.
    #[error("unexpected response returned")]
    UnexpectedResponse,
}
