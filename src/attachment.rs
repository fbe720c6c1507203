//! File attachments encoded as data URIs.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::{AttachmentError, Result};

const DEFAULT_MIME: &str = "application/octet-stream";

/// How the source file's bytes should be turned into the base64 payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentEncoding {
    /// Raw bytes, base64-encoded on construction.
    #[default]
    Raw,
    /// The file already holds base64 text; it is checked and used as-is.
    Base64,
}

/// The serialized form of an attachment, as sent to EDS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    attachment_name: String,
    content: String,
    content_type: String,
}

impl AttachmentRecord {
    /// Display name of the attachment.
    pub fn attachment_name(&self) -> &str {
        &self.attachment_name
    }

    /// The `data:<mime>;base64,<payload>` URI.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// MIME type resolved when the attachment was created.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// A local file prepared for delivery.
///
/// The file is read and encoded once, when the attachment is created.
/// Later changes to the file on disk are not picked up.
///
/// # Examples
/// ```no_run
/// use eds_client::{Attachment, Message};
///
/// # fn main() -> Result<(), eds_client::Error> {
/// let report = Attachment::new("reports/q3.pdf", Some("Q3 report.pdf"))?;
/// assert_eq!(report.record().content_type(), "application/pdf");
///
/// let mut message = Message::new();
/// message.add_attachment(&report);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Attachment {
    path: PathBuf,
    record: AttachmentRecord,
    payload_start: usize,
}

impl Attachment {
    /// Read `path` and base64-encode its bytes.
    ///
    /// `name` defaults to the file's base name.
    pub fn new(path: impl AsRef<Path>, name: Option<&str>) -> Result<Self> {
        Self::with_encoding(path, name, ContentEncoding::Raw)
    }

    /// Like [`Attachment::new`], with an explicit [`ContentEncoding`].
    pub fn with_encoding(
        path: impl AsRef<Path>,
        name: Option<&str>,
        encoding: ContentEncoding,
    ) -> Result<Self> {
        let path = path.as_ref();

        if path.as_os_str().is_empty() {
            return Err(AttachmentError::EmptyPath.into());
        }
        if !path.exists() {
            return Err(AttachmentError::NotFound(path.to_path_buf()).into());
        }

        let read_err = |source: std::io::Error| AttachmentError::Read {
            path: path.to_path_buf(),
            source,
        };

        let (bytes, payload) = match encoding {
            ContentEncoding::Raw => {
                let bytes = fs::read(path).map_err(read_err)?;
                let payload = STANDARD.encode(&bytes);
                (bytes, payload)
            }
            ContentEncoding::Base64 => {
                let text = fs::read_to_string(path).map_err(read_err)?;
                let payload: String = text.split_ascii_whitespace().collect();
                let bytes = STANDARD
                    .decode(&payload)
                    .map_err(|_| AttachmentError::InvalidBase64(path.to_path_buf()))?;
                (bytes, payload)
            }
        };

        if payload.is_empty() {
            return Err(AttachmentError::Empty(path.to_path_buf()).into());
        }

        let attachment_name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => base_name(path),
        };
        let content_type = mime_type(path, &bytes).to_string();
        let prefix = format!("data:{content_type};base64,");

        Ok(Self {
            path: path.to_path_buf(),
            payload_start: prefix.len(),
            record: AttachmentRecord {
                attachment_name,
                content: prefix + &payload,
                content_type,
            },
        })
    }

    /// The record added to a [`crate::Message`].
    pub fn record(&self) -> &AttachmentRecord {
        &self.record
    }

    /// Source file the attachment was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The base64 payload without the data URI prefix.
    pub fn base64(&self) -> &str {
        &self.record.content[self.payload_start..]
    }
}

/// Resolve the MIME type of a file.
///
/// The contents are sniffed first. Then the extension is looked up in a
/// built-in table and in the `mime_guess` registry, in that order.
/// Anything else is `application/octet-stream`.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use eds_client::mime_type;
///
/// let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
/// assert_eq!(mime_type(Path::new("scan"), &png), "image/png");
/// assert_eq!(mime_type(Path::new("notes.txt"), b"hello"), "text/plain");
/// assert_eq!(mime_type(Path::new("blob"), b"hello"), "application/octet-stream");
/// ```
pub fn mime_type(path: &Path, contents: &[u8]) -> &'static str {
    if let Some(kind) = infer::get(contents) {
        return kind.mime_type();
    }

    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    ext.as_deref()
        .and_then(mime_from_extension)
        .or_else(|| mime_guess::from_path(path).first_raw())
        .unwrap_or(DEFAULT_MIME)
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "png" => "image/png",
        "bmp" => "image/x-ms-bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        "swf" => "application/x-shockwave-flash",
        "pdf" => "application/pdf",
        "zip" | "docx" | "xlsx" => "application/zip",
        "gz" => "application/x-gzip",
        "tar" => "application/x-tar",
        "bz" => "application/x-bzip",
        "bz2" => "application/x-bzip2",
        "txt" | "asc" => "text/plain",
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "xml" => "text/xml",
        "xsl" => "application/xsl+xml",
        "ogg" => "application/ogg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "avi" => "video/x-msvideo",
        "mpg" | "mpeg" => "video/mpeg",
        "mov" => "video/quicktime",
        "flv" => "video/x-flv",
        "php" => "text/x-php",
        _ => return None,
    };
    Some(mime)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
