//! Message data model and payload serialization.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::attachment::{Attachment, AttachmentRecord};
use crate::{Result, ValidationError};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

/// Check an address against standard email syntax.
pub fn is_valid_email(address: &str) -> bool {
    let Some((local, _)) = address.rsplit_once('@') else {
        return false;
    };

    local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !address.contains("..")
        && EMAIL_RE.is_match(address)
}

/// A validated mailbox: an email address plus a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub address: String,
    pub name: String,
}

impl Address {
    /// Validate `address` and pair it with a display name.
    ///
    /// The name falls back to the address itself when it is missing or empty.
    pub fn new(address: &str, name: Option<&str>) -> std::result::Result<Self, ValidationError> {
        if !is_valid_email(address) {
            return Err(ValidationError::InvalidAddress(address.to_string()));
        }

        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => address,
        };

        Ok(Self {
            address: address.to_string(),
            name: name.to_string(),
        })
    }
}

/// A free-form `{name, value}` pair forwarded to the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meta {
    pub name: String,
    pub value: Value,
}

/// Something a [`crate::Mailer`] can deliver.
pub trait Deliverable {
    /// Check that every field required for delivery is present.
    fn is_valid_for_delivery(&self) -> Result<bool>;

    /// Render the wire payload.
    fn to_json(&self) -> Result<String>;
}

/// One email to be submitted to EDS.
///
/// Setters validate as they go, so a `Message` never holds a malformed
/// address. Required fields are only checked by
/// [`Message::is_valid_for_delivery`], which [`crate::Mailer::send`] calls
/// before any request is made.
///
/// # Examples
/// ```
/// use eds_client::Message;
///
/// # fn main() -> Result<(), eds_client::Error> {
/// let mut message = Message::new();
/// message
///     .set_subject("Quarterly report")
///     .set_body("<p>See attached.</p>");
/// message.set_to("someone@example.com", Some("John"))?;
/// message.set_from("internal@example.com", None)?;
/// message.add_cc([("joe@example.com", "Joe"), ("not-an-address", "Nobody")]);
///
/// assert_eq!(message.ccs().len(), 1);
/// assert!(message.is_valid_for_delivery()?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    subject: Option<String>,
    reply_to: Option<String>,
    to: Option<Address>,
    from: Option<Address>,
    meta: Vec<Meta>,
    attachments: Vec<AttachmentRecord>,
    ccs: Vec<Address>,
    bccs: Vec<Address>,
    body: Option<String>,
    commercial: bool,
    expose_recipients: bool,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            subject: None,
            reply_to: None,
            to: None,
            from: None,
            meta: Vec::new(),
            attachments: Vec::new(),
            ccs: Vec::new(),
            bccs: Vec::new(),
            body: None,
            commercial: false,
            expose_recipients: true,
        }
    }
}

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a message with subject, recipient and sender in one call.
    ///
    /// Recipient and sender are `(address, name)` pairs. An empty subject is
    /// left unset.
    pub fn compose(
        subject: &str,
        recipient: (&str, Option<&str>),
        sender: (&str, Option<&str>),
    ) -> Result<Self> {
        let mut message = Self::new();
        if !subject.is_empty() {
            message.set_subject(subject);
        }
        message.set_to(recipient.0, recipient.1)?;
        message.set_from(sender.0, sender.1)?;
        Ok(message)
    }

    /// Set the subject line. Any string is accepted.
    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the single recipient, replacing any previous one.
    pub fn set_to(&mut self, address: &str, name: Option<&str>) -> Result<&mut Self> {
        self.to = Some(Address::new(address, name)?);
        Ok(self)
    }

    /// Set the sender, replacing any previous one.
    pub fn set_from(&mut self, address: &str, name: Option<&str>) -> Result<&mut Self> {
        self.from = Some(Address::new(address, name)?);
        Ok(self)
    }

    /// Set the reply-to address.
    ///
    /// # Examples
    /// ```
    /// # use eds_client::Message;
    /// let mut message = Message::new();
    /// assert!(message.set_reply_to("not an address").is_err());
    /// assert!(message.set_reply_to("replies@example.com").is_ok());
    /// assert_eq!(message.reply_to(), Some("replies@example.com"));
    /// ```
    pub fn set_reply_to(&mut self, address: &str) -> Result<&mut Self> {
        if !is_valid_email(address) {
            return Err(ValidationError::InvalidAddress(address.to_string()).into());
        }
        self.reply_to = Some(address.to_string());
        Ok(self)
    }

    /// Append carbon-copy recipients given as `(address, name)` pairs.
    ///
    /// Entries with an invalid address are skipped without error.
    pub fn add_cc<I, A, N>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (A, N)>,
        A: AsRef<str>,
        N: AsRef<str>,
    {
        self.ccs.extend(valid_addresses(entries));
        self
    }

    /// Append blind carbon-copy recipients given as `(address, name)` pairs.
    ///
    /// Entries with an invalid address are skipped without error.
    pub fn add_bcc<I, A, N>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (A, N)>,
        A: AsRef<str>,
        N: AsRef<str>,
    {
        self.bccs.extend(valid_addresses(entries));
        self
    }

    /// Expose cc/bcc recipients in the mail headers (default), or ask the
    /// service to deliver one mail per recipient.
    pub fn show_recipients(&mut self, show: bool) -> &mut Self {
        self.expose_recipients = show;
        self
    }

    /// Set the message body, usually HTML.
    pub fn set_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// Flag the message as commercial in nature.
    pub fn set_commercial(&mut self, commercial: bool) -> &mut Self {
        self.commercial = commercial;
        self
    }

    /// Append one meta record per entry, in iteration order.
    pub fn add_meta<I, K, V>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.meta.extend(entries.into_iter().map(|(name, value)| Meta {
            name: name.into(),
            value: value.into(),
        }));
        self
    }

    /// Append the attachment's [`AttachmentRecord`].
    pub fn add_attachment(&mut self, attachment: &Attachment) -> &mut Self {
        self.attachments.push(attachment.record().clone());
        self
    }

    /// The subject line, if set.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The reply-to address, if set.
    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    /// The recipient, if set.
    pub fn to(&self) -> Option<&Address> {
        self.to.as_ref()
    }

    /// The sender, if set.
    pub fn from(&self) -> Option<&Address> {
        self.from.as_ref()
    }

    /// Carbon-copy recipients, in the order they were added.
    pub fn ccs(&self) -> &[Address] {
        &self.ccs
    }

    /// Blind carbon-copy recipients, in the order they were added.
    pub fn bccs(&self) -> &[Address] {
        &self.bccs
    }

    /// The body, if set.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Meta records, in the order they were added.
    pub fn meta(&self) -> &[Meta] {
        &self.meta
    }

    /// Attachment records, in the order they were added.
    pub fn attachments(&self) -> &[AttachmentRecord] {
        &self.attachments
    }

    /// Whether the message is flagged as commercial.
    pub fn is_commercial(&self) -> bool {
        self.commercial
    }

    /// Whether cc/bcc recipients are exposed in the headers.
    pub fn exposes_recipients(&self) -> bool {
        self.expose_recipients
    }

    /// Ensure `to`, `from` and `subject` are present, in that order.
    ///
    /// The error names the first missing field.
    pub fn is_valid_for_delivery(&self) -> Result<bool> {
        if self.to.is_none() {
            return Err(ValidationError::MissingField("to").into());
        }
        if self.from.is_none() {
            return Err(ValidationError::MissingField("from").into());
        }
        if non_empty(&self.subject).is_none() {
            return Err(ValidationError::MissingField("subject").into());
        }
        Ok(true)
    }

    /// Collect the populated fields into a JSON object.
    ///
    /// Keys follow a fixed order. Empty strings, empty lists and `false`
    /// flags are left out, so `commercial: false` and
    /// `exposeRecipients: false` never reach the wire.
    pub fn to_map(&self) -> Result<Map<String, Value>> {
        let mut map = Map::new();

        if let Some(subject) = non_empty(&self.subject) {
            map.insert("subject".into(), Value::from(subject));
        }
        if let Some(reply_to) = non_empty(&self.reply_to) {
            map.insert("replyTo".into(), Value::from(reply_to));
        }
        if let Some(to) = &self.to {
            map.insert("to".into(), serde_json::to_value(to)?);
        }
        if let Some(from) = &self.from {
            map.insert("from".into(), serde_json::to_value(from)?);
        }
        if !self.meta.is_empty() {
            map.insert("meta".into(), serde_json::to_value(&self.meta)?);
        }
        if !self.attachments.is_empty() {
            map.insert("attachments".into(), serde_json::to_value(&self.attachments)?);
        }
        if !self.ccs.is_empty() {
            map.insert("ccs".into(), serde_json::to_value(&self.ccs)?);
        }
        if !self.bccs.is_empty() {
            map.insert("bccs".into(), serde_json::to_value(&self.bccs)?);
        }
        if let Some(body) = non_empty(&self.body) {
            map.insert("body".into(), Value::from(body));
        }
        if self.commercial {
            map.insert("commercial".into(), Value::Bool(true));
        }
        if self.expose_recipients {
            map.insert("exposeRecipients".into(), Value::Bool(true));
        }

        Ok(map)
    }

    /// Render [`Message::to_map`] as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_map()?)?)
    }
}

impl Deliverable for Message {
    fn is_valid_for_delivery(&self) -> Result<bool> {
        Message::is_valid_for_delivery(self)
    }

    fn to_json(&self) -> Result<String> {
        Message::to_json(self)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn valid_addresses<I, A, N>(entries: I) -> impl Iterator<Item = Address>
where
    I: IntoIterator<Item = (A, N)>,
    A: AsRef<str>,
    N: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|(address, name)| Address::new(address.as_ref(), Some(name.as_ref())).ok())
}
