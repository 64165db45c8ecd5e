//! Upload helpers
//!
//! Pre-flight checks for CSV uploads and the progress reporter fed by the
//! streaming request body.

use std::path::Path;

use super::error::{SourceError, SourceResult};

/// Largest file accepted for upload (50 MB)
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Size of each chunk handed to the transport
pub const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

const ALLOWED_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// Check a file is acceptable before anything is sent
///
/// Returns the file size in bytes.
pub async fn preflight(path: &Path) -> SourceResult<u64> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(SourceError::UploadRejected(format!(
            "{:?} is not a .csv or .txt file",
            path
        )));
    }

    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SourceError::UploadRejected(format!("file not found: {:?}", path))
        } else {
            SourceError::Io(e)
        }
    })?;

    let size = metadata.len();
    if size == 0 {
        return Err(SourceError::UploadRejected("file is empty".to_string()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(SourceError::UploadRejected(format!(
            "file is {} bytes, maximum is {}",
            size, MAX_UPLOAD_BYTES
        )));
    }

    Ok(size)
}

/// Turns byte counts into integer percentages for a callback
///
/// Only emits when the percentage grows. While bytes are in flight the
/// value is capped at 99; 100 is reported once the server has accepted
/// the upload.
pub struct ProgressReporter<F> {
    total: u64,
    sent: u64,
    last: Option<u8>,
    callback: F,
}

impl<F: FnMut(u8)> ProgressReporter<F> {
    pub fn new(total: u64, callback: F) -> Self {
        Self {
            total,
            sent: 0,
            last: None,
            callback,
        }
    }

    /// Record `bytes` more bytes handed to the transport
    pub fn advance(&mut self, bytes: usize) {
        self.sent = (self.sent + bytes as u64).min(self.total);
        let pct = if self.total == 0 {
            0
        } else {
            ((self.sent * 100) / self.total).min(99) as u8
        };
        self.emit(pct);
    }

    /// Report completion
    pub fn finish(&mut self) {
        self.emit(100);
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }

    fn emit(&mut self, pct: u8) {
        if self.last.map_or(true, |last| pct > last) {
            self.last = Some(pct);
            (self.callback)(pct);
        }
    }
}
