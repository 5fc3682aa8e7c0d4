//! Turning user-selected files into attachments.
//!
//! An [`Attachment`] holds the whole file, base64 encoded, next to its media
//! type and file name.  [`ingest_files`] processes a batch and reports every
//! unreadable file separately without giving up on the rest.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::observability::{ATTACHMENTS_FAILED, ATTACHMENTS_INGESTED};
use crate::types::Part;

/// Fallback media type for unrecognized extensions.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A file attached to a user message.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Declared media type, e.g. `image/png`.
    pub mime_type: String,

    /// Base64 encoded file contents.
    pub data: String,

    /// File name shown to the user.
    pub name: String,
}

impl Attachment {
    /// Create an attachment from already encoded data.
    pub fn new(
        mime_type: impl Into<String>,
        data: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
            name: name.into(),
        }
    }

    /// Create an attachment by encoding raw bytes.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8], name: impl Into<String>) -> Self {
        Self::new(
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes),
            name,
        )
    }

    /// Read a file and encode it as an attachment.
    ///
    /// The media type is derived from the file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut file = File::open(path).map_err(|err| {
            Error::attachment(&name, format!("cannot open file: {err}"), Some(Box::new(err)))
        })?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).map_err(|err| {
            Error::attachment(&name, format!("cannot read file: {err}"), Some(Box::new(err)))
        })?;

        Ok(Self::from_bytes(mime_type_for_path(path), &buffer, name))
    }

    /// True for image media types.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Size of the decoded payload, computed from the encoded length.
    pub fn decoded_len(&self) -> usize {
        let padding = self.data.bytes().rev().take_while(|b| *b == b'=').count();
        (self.data.len() / 4 * 3).saturating_sub(padding)
    }

    /// The request part carrying this attachment.
    pub fn to_part(&self) -> Part {
        Part::inline_data(&self.mime_type, &self.data)
    }
}

/// Guess a media type from a file extension.
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html",
        Some("json") => "application/json",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("mp4") => "video/mp4",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// A file that could not be ingested.
#[derive(Debug, Clone)]
pub struct AttachmentFailure {
    /// Path as given by the caller.
    pub path: PathBuf,
    /// Why it failed.
    pub error: Error,
}

/// Outcome of ingesting a batch of files.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Successfully loaded attachments, in input order.
    pub attachments: Vec<Attachment>,
    /// One entry per file that failed, in input order.
    pub failures: Vec<AttachmentFailure>,
}

impl IngestReport {
    /// True when every file loaded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ingest a batch of files.
///
/// A failure is recorded for the offending file and processing continues with
/// the next one.
pub fn ingest_files<I, P>(paths: I) -> IngestReport
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut report = IngestReport::default();
    for path in paths {
        let path = path.as_ref();
        match Attachment::from_path(path) {
            Ok(attachment) => {
                ATTACHMENTS_INGESTED.click();
                report.attachments.push(attachment);
            }
            Err(error) => {
                ATTACHMENTS_FAILED.click();
                report.failures.push(AttachmentFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }
    report
}
