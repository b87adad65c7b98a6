//! Image Capture
//!
//! Turns a user-supplied photo into the in-memory form the workflow needs: the
//! raw bytes, a validated media type, a base64 payload for the backend and a
//! data URL the surface can display.
//!
//! # Single-file semantics
//!
//! Surfaces may hand over several files at once (a multi-file drop). Only the
//! first one is used; the rest are counted and reported back through
//! [`CaptureOutcome::ignored_files`] so the user learns that something was dropped.
//!
//! # Validation
//!
//! The declared type (MIME string, or the file extension when no MIME is given)
//! must be PNG, JPEG or WEBP. The bytes are then sniffed with `infer`; the
//! sniffed type wins when the two disagree, and a sniffed non-accepted type is
//! rejected. Bytes that cannot be identified at all are treated as a read
//! failure, not a type failure.

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default upper bound on a single photo (20 MiB)
pub const DEFAULT_MAX_PHOTO_BYTES: u64 = 20 * 1024 * 1024;

/// Image types accepted into the workflow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    /// image/png
    Png,
    /// image/jpeg
    Jpeg,
    /// image/webp
    Webp,
}

impl MediaType {
    /// Every accepted type
    pub const ACCEPTED: [MediaType; 3] = [MediaType::Png, MediaType::Jpeg, MediaType::Webp];

    /// Parse a MIME string, ignoring parameters and case
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Map a file extension (without the dot)
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Guess from a path's extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical MIME string
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime())
    }
}

/// A file exactly as the surface received it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawFile {
    /// File name as shown to the user
    pub name: String,
    /// MIME type reported by the surface, if any
    pub declared_type: Option<String>,
    /// File contents
    pub bytes: Vec<u8>,
}

impl RawFile {
    /// Create a file from parts
    pub fn new(name: impl Into<String>, declared_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type,
            bytes,
        }
    }

    /// Read a file from disk; the declared type is left to extension detection
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Encoding`] if the file cannot be read.
    pub async fn from_path(path: &Path) -> Result<Self, CaptureError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CaptureError::Encoding(format!("{}: {e}", path.display())))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, None, bytes))
    }

    fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }
}

/// A validated, encoded photo ready for generation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedImage {
    /// Original file name
    pub file_name: String,
    /// Raw file bytes
    pub raw: Vec<u8>,
    /// Validated media type
    pub media_type: MediaType,
    /// Standard base64 of `raw`
    pub encoded: String,
    /// `data:` URL for display
    pub preview: String,
}

impl CapturedImage {
    /// Decode the payload back to bytes
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Encoding`] if the payload is not valid base64.
    pub fn decode_payload(&self) -> Result<Vec<u8>, CaptureError> {
        decode_base64(&self.encoded)
    }

    /// Size of the raw file in bytes
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.raw.len()
    }
}

/// Result of a capture: the image plus how many extra files were dropped
#[derive(Clone, Debug)]
pub struct CaptureOutcome {
    /// The captured image
    pub image: CapturedImage,
    /// Number of files after the first that were not used
    pub ignored_files: usize,
}

/// Capture failures
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The file is not an accepted image type
    #[error("{file_name}: unsupported media type {found}")]
    UnsupportedMediaType {
        /// File that was rejected
        file_name: String,
        /// What it was detected or declared as
        found: String,
    },

    /// Nothing was submitted
    #[error("no file was provided")]
    NoFile,

    /// The file exceeds the configured size limit
    #[error("{file_name} is {size} bytes (limit {limit})")]
    TooLarge {
        /// File that was rejected
        file_name: String,
        /// Actual size
        size: u64,
        /// Configured limit
        limit: u64,
    },

    /// The file could not be read or decoded
    #[error("{0}")]
    Encoding(String),
}

/// Validates and encodes photos
#[derive(Clone, Debug)]
pub struct ImageCapture {
    max_bytes: u64,
}

impl Default for ImageCapture {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PHOTO_BYTES)
    }
}

impl ImageCapture {
    /// Create a capture adapter with a size limit
    #[must_use]
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Capture the first of `files`
    ///
    /// # Errors
    ///
    /// [`CaptureError::UnsupportedMediaType`] for non-image files,
    /// [`CaptureError::NoFile`], [`CaptureError::TooLarge`] or
    /// [`CaptureError::Encoding`] for unreadable input.
    pub fn capture(&self, files: Vec<RawFile>) -> Result<CaptureOutcome, CaptureError> {
        let ignored_files = files.len().saturating_sub(1);
        let file = files.into_iter().next().ok_or(CaptureError::NoFile)?;

        if ignored_files > 0 {
            tracing::debug!(
                file = %file.name,
                ignored = ignored_files,
                "Multiple files submitted, using the first"
            );
        }

        let image = self.capture_one(file)?;
        Ok(CaptureOutcome {
            image,
            ignored_files,
        })
    }

    fn capture_one(&self, file: RawFile) -> Result<CapturedImage, CaptureError> {
        let declared = match file.declared_type.as_deref() {
            Some(mime) => MediaType::from_mime(mime).ok_or_else(|| {
                CaptureError::UnsupportedMediaType {
                    file_name: file.name.clone(),
                    found: mime.to_string(),
                }
            })?,
            None => file
                .extension()
                .and_then(MediaType::from_extension)
                .ok_or_else(|| CaptureError::UnsupportedMediaType {
                    file_name: file.name.clone(),
                    found: file
                        .extension()
                        .map_or_else(|| "unknown".to_string(), |e| format!(".{e}")),
                })?,
        };

        if file.bytes.is_empty() {
            return Err(CaptureError::Encoding(format!("{} is empty", file.name)));
        }

        let size = file.bytes.len() as u64;
        if size > self.max_bytes {
            return Err(CaptureError::TooLarge {
                file_name: file.name,
                size,
                limit: self.max_bytes,
            });
        }

        let media_type = sniff(&file.name, &file.bytes)?;
        if media_type != declared {
            tracing::debug!(
                file = %file.name,
                declared = %declared,
                detected = %media_type,
                "Declared media type differs from file contents"
            );
        }

        let encoded = general_purpose::STANDARD.encode(&file.bytes);
        let preview = data_url(media_type.mime(), &encoded);

        tracing::info!(
            file = %file.name,
            media_type = %media_type,
            bytes = size,
            "Photo captured"
        );

        Ok(CapturedImage {
            file_name: file.name,
            raw: file.bytes,
            media_type,
            encoded,
            preview,
        })
    }
}

/// Identify image bytes by signature
fn sniff(file_name: &str, bytes: &[u8]) -> Result<MediaType, CaptureError> {
    let kind = infer::get(bytes).ok_or_else(|| {
        CaptureError::Encoding(format!("{file_name} is not a readable image"))
    })?;

    MediaType::from_mime(kind.mime_type()).ok_or_else(|| CaptureError::UnsupportedMediaType {
        file_name: file_name.to_string(),
        found: kind.mime_type().to_string(),
    })
}

/// Build a `data:` URL from a MIME type and base64 payload
#[must_use]
pub fn data_url(mime: &str, encoded: &str) -> String {
    format!("data:{mime};base64,{encoded}")
}

/// Decode standard base64, accepting a `data:` URL prefix
///
/// # Errors
///
/// Returns [`CaptureError::Encoding`] if the input is not valid base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, CaptureError> {
    let trimmed = data.trim();
    let payload = match trimmed.find(";base64,") {
        Some(idx) if trimmed.starts_with("data:") => &trimmed[idx + 8..],
        _ => trimmed,
    };
    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| CaptureError::Encoding(format!("invalid base64: {e}")))
}

/// Best-effort MIME type for displaying decoded image bytes
#[must_use]
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    infer::get(bytes)
        .filter(|k| k.matcher_type() == infer::MatcherType::Image)
        .map_or("image/png", |k| k.mime_type())
}
