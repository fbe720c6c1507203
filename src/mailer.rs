//! EDS mailer implementation.

use std::fmt;
use std::time::Duration;

use reqwest::Method;
use tracing::debug;

use crate::Result;
use crate::message::Deliverable;
use crate::response::{
    FnInterpreter, RawResponse, ResponseInterpreter, RetrievalInterpreter, SubmissionInterpreter,
};
use crate::transport::{HttpTransport, Logger, Request, RequestOptions, Transport};

type Upstream = Box<dyn ResponseInterpreter<Output = String>>;
type Downstream = Box<dyn ResponseInterpreter<Output = RawResponse>>;

/// Blocking client for the Email Delivery Service.
///
/// Use [`Mailer::new`] for defaults or [`Mailer::builder`] for custom settings
/// like the API version, proxies, TLS behavior, and timeouts.
pub struct Mailer {
    transport: Box<dyn Transport>,
    endpoint: String,
    application_key: String,
    api_version: String,
    proxy: Option<String>,
    upstream_parser: Option<Upstream>,
    downstream_parser: Option<Downstream>,
    logger: Option<Box<Logger>>,
}

impl Mailer {
    /// Create a builder for configuring the mailer.
    pub fn builder(
        endpoint: impl Into<String>,
        application_key: impl Into<String>,
    ) -> MailerBuilder {
        MailerBuilder::new(endpoint, application_key)
    }

    /// Create a mailer for `endpoint` using API version `1`.
    ///
    /// # Examples
    /// ```no_run
    /// # use eds_client::Mailer;
    /// # fn main() -> Result<(), eds_client::Error> {
    /// let mailer = Mailer::new("https://eds.example.com", "my-app-key")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(endpoint: impl Into<String>, application_key: impl Into<String>) -> Result<Self> {
        MailerBuilder::new(endpoint, application_key).build()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn application_key(&self) -> &str {
        &self.application_key
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Get the proxy URL if one was configured.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Submit a message for delivery.
    ///
    /// The message is validated first; an invalid message never reaches the
    /// network.
    ///
    /// # Returns
    /// The identifier EDS assigned to the message, or whatever the registered
    /// upstream parser derives from the response.
    ///
    /// # Examples
    /// ```no_run
    /// # use eds_client::{Mailer, Message, RequestOptions};
    /// # fn main() -> Result<(), eds_client::Error> {
    /// let mailer = Mailer::new("https://eds.example.com", "my-app-key")?;
    /// let message = Message::compose(
    ///     "Welcome",
    ///     ("someone@example.com", Some("John")),
    ///     ("internal@example.com", None),
    /// )?;
    /// let id = mailer.send(&message, &RequestOptions::default())?;
    /// println!("{id}");
    /// # Ok(())
    /// # }
    /// ```
    pub fn send<M>(&self, message: &M, options: &RequestOptions) -> Result<String>
    where
        M: Deliverable + ?Sized,
    {
        let response = self.submit(message, options)?;

        match &self.upstream_parser {
            Some(parser) => parser.interpret(response),
            None => SubmissionInterpreter.interpret(response),
        }
    }

    /// Submit a message and read the response with `interpreter`.
    ///
    /// The registered upstream parser is not consulted, and the result can
    /// be any type the interpreter produces.
    ///
    /// # Examples
    /// ```no_run
    /// # use eds_client::{Mailer, Message, RawResponse, RequestOptions, FnInterpreter};
    /// # fn main() -> Result<(), eds_client::Error> {
    /// let mailer = Mailer::new("https://eds.example.com", "my-app-key")?;
    /// let message = Message::compose(
    ///     "Welcome",
    ///     ("someone@example.com", None),
    ///     ("internal@example.com", None),
    /// )?;
    /// let status = FnInterpreter::new(|response: RawResponse| -> eds_client::Result<Option<u16>> {
    ///     Ok(response.status)
    /// });
    /// let code = mailer.send_with(&message, &RequestOptions::default(), &status)?;
    /// println!("{code:?}");
    /// # Ok(())
    /// # }
    /// ```
    pub fn send_with<M, I>(
        &self,
        message: &M,
        options: &RequestOptions,
        interpreter: &I,
    ) -> Result<I::Output>
    where
        M: Deliverable + ?Sized,
        I: ResponseInterpreter + ?Sized,
    {
        let response = self.submit(message, options)?;
        interpreter.interpret(response)
    }

    /// Fetch a previously submitted message by id.
    ///
    /// # Returns
    /// The decoded response, or whatever the registered downstream parser
    /// derives from it.
    ///
    /// # Examples
    /// ```no_run
    /// # use eds_client::{Mailer, RequestOptions};
    /// # fn main() -> Result<(), eds_client::Error> {
    /// let mailer = Mailer::new("https://eds.example.com", "my-app-key")?;
    /// let response = mailer.get_message("abc", &RequestOptions::default())?;
    /// println!("{}", response.body);
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_message(
        &self,
        message_id: impl fmt::Display,
        options: &RequestOptions,
    ) -> Result<RawResponse> {
        let response = self.fetch(message_id, options);

        match &self.downstream_parser {
            Some(parser) => parser.interpret(response),
            None => RetrievalInterpreter.interpret(response),
        }
    }

    /// Fetch a message and read the response with `interpreter`.
    ///
    /// The registered downstream parser is not consulted.
    pub fn get_message_with<I>(
        &self,
        message_id: impl fmt::Display,
        options: &RequestOptions,
        interpreter: &I,
    ) -> Result<I::Output>
    where
        I: ResponseInterpreter + ?Sized,
    {
        interpreter.interpret(self.fetch(message_id, options))
    }

    /// Replace the default reading of submission responses.
    ///
    /// The parser receives the raw response and owns error detection
    /// entirely.
    pub fn set_upstream_parser<F>(&mut self, parser: F)
    where
        F: Fn(RawResponse) -> Result<String> + Send + Sync + 'static,
    {
        self.set_upstream_interpreter(FnInterpreter::new(parser));
    }

    pub fn set_upstream_interpreter<I>(&mut self, interpreter: I)
    where
        I: ResponseInterpreter<Output = String> + 'static,
    {
        self.upstream_parser = Some(Box::new(interpreter));
    }

    /// Replace the default reading of lookup responses.
    ///
    /// The parser receives the raw response and owns error detection
    /// entirely.
    pub fn set_downstream_parser<F>(&mut self, parser: F)
    where
        F: Fn(RawResponse) -> Result<RawResponse> + Send + Sync + 'static,
    {
        self.set_downstream_interpreter(FnInterpreter::new(parser));
    }

    pub fn set_downstream_interpreter<I>(&mut self, interpreter: I)
    where
        I: ResponseInterpreter<Output = RawResponse> + 'static,
    {
        self.downstream_parser = Some(Box::new(interpreter));
    }

    /// Run every request in debug mode, sending transport output to `logger`.
    pub fn set_logger<F>(&mut self, logger: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.logger = Some(Box::new(logger));
    }

    /// URI for message submission.
    pub fn post_route(&self) -> String {
        format!(
            "{}/api/v{}/{}/messages",
            self.endpoint, self.api_version, self.application_key
        )
    }

    /// URI for message retrieval.
    pub fn retrieve_route(&self, message_id: impl fmt::Display) -> String {
        format!("{}/{}", self.post_route(), message_id)
    }

    fn submit<M>(&self, message: &M, options: &RequestOptions) -> Result<RawResponse>
    where
        M: Deliverable + ?Sized,
    {
        message.is_valid_for_delivery()?;
        let payload = message.to_json()?;
        let url = self.post_route();

        debug!(url = %url, "submitting message");
        Ok(self.execute(Method::POST, &url, Some(&payload), options))
    }

    fn fetch(&self, message_id: impl fmt::Display, options: &RequestOptions) -> RawResponse {
        let url = self.retrieve_route(message_id);

        debug!(url = %url, "fetching message");
        self.execute(Method::GET, &url, None, options)
    }

    fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        options: &RequestOptions,
    ) -> RawResponse {
        self.transport.execute(Request {
            method,
            url,
            body,
            options,
            logger: self.logger.as_deref(),
        })
    }
}

impl fmt::Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailer")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("proxy", &self.proxy)
            .field("upstream_parser", &self.upstream_parser.is_some())
            .field("downstream_parser", &self.downstream_parser.is_some())
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

const DEFAULT_API_VERSION: &str = "1";
const USER_AGENT_VALUE: &str = concat!("eds-client/", env!("CARGO_PKG_VERSION"));

/// Builder for configuring a [`Mailer`].
///
/// Start with [`Mailer::builder`] to override defaults.
pub struct MailerBuilder {
    endpoint: String,
    application_key: String,
    api_version: String,
    proxy: Option<String>,
    danger_accept_invalid_certs: bool,
    user_agent: String,
    timeout: Option<Duration>,
    transport: Option<Box<dyn Transport>>,
}

impl MailerBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - API version `1`
    /// - No proxy
    /// - `danger_accept_invalid_certs = false`
    /// - `eds-client/<version>` user agent
    /// - The HTTP client's default timeout
    pub fn new(endpoint: impl Into<String>, application_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            application_key: application_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            proxy: None,
            danger_accept_invalid_certs: false,
            user_agent: USER_AGENT_VALUE.to_string(),
            timeout: None,
            transport: None,
        }
    }

    /// Use another EDS API version (the `v{version}` route segment).
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set a proxy URL (e.g., "http://127.0.0.1:8080" or "socks5://127.0.0.1:1080").
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Control whether to accept invalid TLS certificates (default: false).
    pub fn danger_accept_invalid_certs(mut self, value: bool) -> Self {
        self.danger_accept_invalid_certs = value;
        self
    }

    /// Override the default user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Default timeout for every request; [`RequestOptions::timeout`] wins
    /// per call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a custom transport instead of the `reqwest` one.
    ///
    /// Proxy, TLS, user agent and timeout settings are ignored in that case.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Build the mailer.
    ///
    /// # Examples
    /// ```no_run
    /// # use std::time::Duration;
    /// # use eds_client::Mailer;
    /// # fn main() -> Result<(), eds_client::Error> {
    /// let mailer = Mailer::builder("https://eds.example.com", "my-app-key")
    ///     .api_version("2")
    ///     .timeout(Duration::from_secs(10))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(self) -> Result<Mailer> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = reqwest::blocking::Client::builder()
                    .danger_accept_invalid_certs(self.danger_accept_invalid_certs)
                    .user_agent(self.user_agent.as_str());

                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                if let Some(proxy_url) = &self.proxy {
                    builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
                }

                Box::new(HttpTransport::new(builder.build()?))
            }
        };

        Ok(Mailer {
            transport,
            endpoint: self.endpoint,
            application_key: self.application_key,
            api_version: self.api_version,
            proxy: self.proxy,
            upstream_parser: None,
            downstream_parser: None,
            logger: None,
        })
    }
}

impl fmt::Debug for MailerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerBuilder")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("proxy", &self.proxy)
            .field("danger_accept_invalid_certs", &self.danger_accept_invalid_certs)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("custom_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}
