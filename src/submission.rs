use std::fs;
use std::path::Path;

use crate::errors::ScanError;

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> FileUpload {
        FileUpload {
            filename: filename.into(),
            bytes,
        }
    }

    /// Reads the whole file into memory. The multipart field carries the
    /// file's own name, not its path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<FileUpload, ScanError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("upload"));
        Ok(FileUpload { filename, bytes })
    }
}

/// What gets sent to `POST /analyze`: exactly one multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    File(FileUpload),
    Url(String),
}

impl Submission {
    /// Picks the submission out of the two optional inputs.
    ///
    /// The file wins when both are present. An empty URL counts as absent, and
    /// with nothing left the call fails with a validation error.
    pub fn from_parts(file: Option<FileUpload>, url: Option<String>) -> Result<Submission, ScanError> {
        if let Some(file) = file {
            return Ok(Submission::File(file));
        }
        match url {
            Some(url) if !url.is_empty() => Ok(Submission::Url(url)),
            _ => Err(ScanError::missing_input()),
        }
    }

    /// Name of the multipart field this submission is sent as.
    pub fn field_name(&self) -> &'static str {
        match self {
            Submission::File(_) => "file",
            Submission::Url(_) => "url",
        }
    }

    /// Short description for log lines.
    pub fn describe(&self) -> String {
        match self {
            Submission::File(file) => format!("file {} ({} bytes)", file.filename, file.bytes.len()),
            Submission::Url(url) => format!("url {}", url),
        }
    }
}
