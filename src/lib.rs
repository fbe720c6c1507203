//! # EDS Client
//! Blocking client for the Email Delivery Service (EDS) HTTP API: build a [`Message`], attach files with [`Attachment`], submit it through a [`Mailer`], and look it up again by id.
//!
//! ## Audience and uses
//! For Rust applications that hand transactional or bulk mail to EDS instead of speaking SMTP themselves. Messages are validated as they are built, so malformed addresses are caught before any request is made.
//!
//! ## Runtime requirements
//! Synchronous only. Each [`Mailer::send`] or [`Mailer::get_message`] performs one blocking HTTP round trip through `reqwest::blocking`; do not call it from inside an async runtime's worker thread.
//!
//! ## Out of scope
//! No batching, retries, queuing or persistence. Per-recipient delivery (see [`Message::show_recipients`]) is performed by EDS, not by this crate.
//!
//! ## Errors
//! Bad input surfaces as [`Error::Validation`], unreadable files as [`Error::Attachment`], and anything the service or the transport reports as [`Error::MailService`]. The crate-wide [`Result`] alias wraps these errors.
//!
//! ## Example
//! ```no_run
//! use eds_client::{Attachment, Mailer, Message, RequestOptions};
//!
//! fn main() -> Result<(), eds_client::Error> {
//!     let mailer = Mailer::new("https://eds.example.com", "my-app-key")?;
//!
//!     let mut message = Message::compose(
//!         "Your invoice",
//!         ("someone@example.com", Some("John")),
//!         ("billing@example.com", Some("Billing")),
//!     )?;
//!     message.set_body("<p>Invoice attached.</p>");
//!     message.add_attachment(&Attachment::new("invoice.pdf", None)?);
//!
//!     let id = mailer.send(&message, &RequestOptions::default())?;
//!     let status = mailer.get_message(&id, &RequestOptions::default())?;
//!     println!("{id}: {}", status.body);
//!     Ok(())
//! }
//! ```

mod attachment;
mod error;
mod mailer;
mod message;
mod response;
mod transport;

pub use attachment::{Attachment, AttachmentRecord, ContentEncoding, mime_type};
pub use error::{AttachmentError, Error, MailServiceError, ValidationError};
pub use mailer::{Mailer, MailerBuilder};
pub use message::{Address, Deliverable, Message, Meta, is_valid_email};
pub use response::{
    FnInterpreter, RawResponse, ResponseInterpreter, RetrievalInterpreter, SubmissionInterpreter,
};
pub use transport::{HttpTransport, Logger, Request, RequestOptions, Transport};

/// Result type alias for EDS operations.
///
/// This is equivalent to `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
