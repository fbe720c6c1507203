//! HTTP transport used by [`crate::Mailer`].

use std::fmt;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::response::RawResponse;

/// Debug hook receiving one line per transport event.
pub type Logger = dyn Fn(&str) + Send + Sync;

/// Per-call options handed to the transport untouched.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the client-wide timeout for this request.
    pub timeout: Option<Duration>,
    /// Extra headers; they replace defaults with the same name.
    pub headers: HeaderMap,
}

impl RequestOptions {
    /// Options that change nothing: no timeout override, no extra headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the client timeout for this request only.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a header on this request, replacing an earlier value for `name`.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A single request handed to a [`Transport`].
pub struct Request<'a> {
    pub method: Method,
    pub url: &'a str,
    /// JSON payload, if any.
    pub body: Option<&'a str>,
    pub options: &'a RequestOptions,
    /// Set when the mailer runs in debug mode.
    pub logger: Option<&'a Logger>,
}

impl Request<'_> {
    fn log(&self, line: impl FnOnce() -> String) {
        if let Some(logger) = self.logger {
            logger(&line());
        }
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("body", &self.body)
            .field("options", &self.options)
            .field("debug", &self.logger.is_some())
            .finish()
    }
}

/// Performs HTTP round trips for the mailer.
///
/// Failures to obtain a response are reported through
/// [`RawResponse::error`] rather than as an `Err`, so that response
/// interpreters see every outcome.
pub trait Transport: Send + Sync {
    fn execute(&self, request: Request<'_>) -> RawResponse;
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(http: reqwest::blocking::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: Request<'_>) -> RawResponse {
        request.log(|| format!("{} {}", request.method, request.url));

        let mut builder = self
            .http
            .request(request.method.clone(), request.url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(body) = request.body {
            request.log(|| format!("request body: {body}"));
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body.to_string());
        }
        if let Some(timeout) = request.options.timeout {
            builder = builder.timeout(timeout);
        }
        builder = builder.headers(request.options.headers.clone());

        let response = match builder.send() {
            Ok(response) => response,
            Err(err) => {
                warn!(method = %request.method, url = request.url, error = %err, "request failed");
                request.log(|| format!("request failed: {err}"));
                return RawResponse::transport_error(err.to_string());
            }
        };

        let status = response.status().as_u16();
        let text = match response.text() {
            Ok(text) => text,
            Err(err) => {
                request.log(|| format!("reading response failed: {err}"));
                return RawResponse::transport_error(err.to_string());
            }
        };

        debug!(method = %request.method, url = request.url, status, "request completed");
        request.log(|| format!("response status: {status}"));
        request.log(|| format!("response body: {text}"));

        RawResponse::from_text(status, &text)
    }
}
