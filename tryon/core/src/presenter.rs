//! Result Presenter
//!
//! Read-only view over a session in `ResultReady`: before/after previews plus
//! the two export actions (save to disk, share link).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;

use crate::backend::{ShareLink, TryOnBackend};
use crate::catalog::OutfitItem;
use crate::error::TryOnError;
use crate::messages::{TryOnId, WorkflowStage};
use crate::session::{TryOnResult, TryOnSession};

/// Name of an exported result file
#[must_use]
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("pet-tryon-{}.png", at.timestamp_millis())
}

/// Presents the result of a finished try-on
#[derive(Debug)]
pub struct ResultPresenter<'a> {
    session: &'a TryOnSession,
    result: &'a TryOnResult,
}

impl<'a> ResultPresenter<'a> {
    /// Wrap a session that has a result
    ///
    /// # Errors
    ///
    /// [`TryOnError::InvalidTransition`] unless the session is in `ResultReady`.
    pub fn new(session: &'a TryOnSession) -> Result<Self, TryOnError> {
        match (session.stage(), session.result()) {
            (WorkflowStage::ResultReady, Some(result)) => Ok(Self { session, result }),
            (stage, _) => Err(TryOnError::InvalidTransition {
                stage,
                action: "present a result",
            }),
        }
    }

    /// Backend identifier of the result
    #[must_use]
    pub fn result_id(&self) -> &TryOnId {
        &self.result.id
    }

    /// The outfit that was applied
    #[must_use]
    pub fn outfit(&self) -> Option<&OutfitItem> {
        self.session.selected_outfit()
    }

    /// The customer's original photo
    #[must_use]
    pub fn before_preview(&self) -> Option<&str> {
        self.session.captured_image().map(|image| image.preview.as_str())
    }

    /// The generated image
    #[must_use]
    pub fn after_preview(&self) -> String {
        self.result.preview()
    }

    /// Backend message that came with the result
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.result.message.as_deref()
    }

    /// Write the result image into `dir`, returning the file's path
    ///
    /// The directory is created if missing; an existing file is never
    /// overwritten.
    ///
    /// # Errors
    ///
    /// [`TryOnError::Export`] if decoding or writing fails.
    pub async fn export_as_file(&self, dir: &Path) -> Result<PathBuf, TryOnError> {
        let bytes = self.result.decode()?;
        let export_error = |e: std::io::Error| TryOnError::Export(format!("{}: {e}", dir.display()));

        tokio::fs::create_dir_all(dir).await.map_err(export_error)?;

        let base = export_file_name(Utc::now());
        let stem = base.trim_end_matches(".png");
        let mut attempt = 0u32;
        let (path, mut file) = loop {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{stem}-{attempt}.png")
            };
            let path = dir.join(name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < 100 => {
                    attempt += 1;
                }
                Err(e) => return Err(export_error(e)),
            }
        };

        file.write_all(&bytes).await.map_err(export_error)?;
        file.flush().await.map_err(export_error)?;

        tracing::info!(
            result_id = %self.result.id,
            path = %path.display(),
            bytes = bytes.len(),
            "Exported try-on result"
        );
        Ok(path)
    }

    /// Ask the backend for a share link
    ///
    /// # Errors
    ///
    /// [`TryOnError::LinkGeneration`] on any backend failure.
    pub async fn build_share_link<B>(&self, backend: &B) -> Result<ShareLink, TryOnError>
    where
        B: TryOnBackend + ?Sized,
    {
        let link = backend
            .share_link(&self.result.id)
            .await
            .map_err(TryOnError::from_share)?;
        tracing::info!(result_id = %self.result.id, "Share link created");
        Ok(link)
    }
}
