//! Decoded transport responses and their interpretation.

use serde_json::Value;
use tracing::warn;

use crate::{MailServiceError, Result};

/// A response as decoded by the transport.
///
/// `error` is set when no HTTP response was obtained at all. `body` holds the
/// decoded JSON, the raw text as a JSON string if it was not JSON, or `null`
/// if it was empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: Option<u16>,
    pub body: Value,
    pub error: Option<String>,
}

impl RawResponse {
    /// A response that reached the service, with its decoded body.
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status: Some(status),
            body,
            error: None,
        }
    }

    /// A response for a request that never completed.
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: Value::Null,
            error: Some(message.into()),
        }
    }

    /// Decode a response body, keeping non-JSON text as a string.
    pub fn from_text(status: u16, text: &str) -> Self {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        };
        Self::new(status, body)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// Look up a top-level string field of the body.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }
}

/// Turns a [`RawResponse`] into a result or an error.
///
/// [`crate::Mailer`] uses [`SubmissionInterpreter`] and
/// [`RetrievalInterpreter`] unless another implementation is registered.
pub trait ResponseInterpreter: Send + Sync {
    type Output;

    fn interpret(&self, response: RawResponse) -> Result<Self::Output>;
}

/// Adapts a closure into a [`ResponseInterpreter`].
#[derive(Debug, Clone)]
pub struct FnInterpreter<F>(F);

impl<F> FnInterpreter<F> {
    /// Wrap a closure taking the raw response.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F, T> ResponseInterpreter for FnInterpreter<F>
where
    F: Fn(RawResponse) -> Result<T> + Send + Sync,
{
    type Output = T;

    fn interpret(&self, response: RawResponse) -> Result<T> {
        (self.0)(response)
    }
}

/// Default interpretation of a submission: yields the assigned message id.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionInterpreter;

impl ResponseInterpreter for SubmissionInterpreter {
    type Output = String;

    fn interpret(&self, response: RawResponse) -> Result<String> {
        check_request_errors(&response)?;

        match response.str_field("status") {
            Some("REJECTED") => {
                let reason = response
                    .body
                    .get("rejectionReason")
                    .map(|reason| match reason {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| "unspecified".to_string());
                warn!(reason = %reason, "message rejected by EDS");
                Err(MailServiceError::Rejected(reason).into())
            }
            Some("ACCEPTED") => response
                .str_field("messageId")
                .map(str::to_string)
                .ok_or_else(|| MailServiceError::UnexpectedResponse.into()),
            _ => Err(MailServiceError::UnexpectedResponse.into()),
        }
    }
}

/// Default interpretation of a lookup: the response itself, once it is
/// known not to be an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrievalInterpreter;

impl ResponseInterpreter for RetrievalInterpreter {
    type Output = RawResponse;

    fn interpret(&self, response: RawResponse) -> Result<RawResponse> {
        check_request_errors(&response)?;
        Ok(response)
    }
}

// EDS answers 404 for an unknown application key.
fn check_request_errors(response: &RawResponse) -> std::result::Result<(), MailServiceError> {
    if let Some(message) = &response.error {
        warn!(error = %message, "mail transport failed");
        return Err(MailServiceError::Transport(message.clone()));
    }
    if response.is_not_found() {
        return Err(MailServiceError::NotFound);
    }
    Ok(())
}
