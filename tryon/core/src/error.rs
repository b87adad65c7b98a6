//! Workflow Errors
//!
//! The error taxonomy the controller surfaces to users. Lower layers keep their
//! own error types ([`GatewayError`], [`CaptureError`]) and convert into
//! [`TryOnError`] at the point where the workflow knows what the failure means:
//! a transport failure while loading the catalog is a `Network` error, while the
//! same failure during a share request is a `LinkGeneration` error.
//!
//! Nothing here is fatal. Every variant leaves the session in a previously valid
//! state and is reported to the surface.

use thiserror::Error;

use crate::backend::GatewayError;
use crate::capture::CaptureError;
use crate::messages::WorkflowStage;

/// Errors produced by the try-on workflow
#[derive(Debug, Error)]
pub enum TryOnError {
    /// Transport-level failure reaching the backend
    #[error("Could not reach the try-on service: {0}")]
    Network(String),

    /// The catalog loaded fine but holds no outfits
    #[error("No outfits are available yet")]
    EmptyCatalog,

    /// A locally configured catalog could not be read
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The submitted file is not one of the accepted image types
    #[error("Unsupported file type '{media_type}' (accepted: PNG, JPG, WEBP)")]
    UnsupportedMediaType {
        /// What was submitted
        media_type: String,
    },

    /// Reading or encoding the photo failed; the previous state is untouched
    #[error("Could not read the photo: {0}")]
    Recoverable(String),

    /// The backend answered but produced no usable image
    #[error("Image generation failed: {0}")]
    Generation(String),

    /// A share link could not be produced
    #[error("Could not create a share link: {0}")]
    LinkGeneration(String),

    /// Writing the result image failed
    #[error("Could not save the image: {0}")]
    Export(String),

    /// The requested outfit is not in the loaded catalog
    #[error("Unknown outfit: {0}")]
    UnknownOutfit(String),

    /// User input failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A generation is already running for this session
    #[error("A try-on is already being generated, please wait")]
    GenerationInFlight,

    /// An action is not valid in the current stage
    #[error("Cannot {action} while in stage {stage}")]
    InvalidTransition {
        /// Stage the session was in
        stage: WorkflowStage,
        /// What was attempted
        action: &'static str,
    },
}

impl TryOnError {
    /// Classify a gateway failure that happened while loading the catalog
    #[must_use]
    pub fn from_catalog(error: GatewayError) -> Self {
        Self::Network(error.to_string())
    }

    /// Classify a gateway failure that happened during generation
    ///
    /// Transport failures stay network errors; anything the backend actually
    /// answered (bad status, missing payload) is a generation error.
    #[must_use]
    pub fn from_generation(error: GatewayError) -> Self {
        match error {
            GatewayError::Transport { .. } => Self::Network(error.to_string()),
            other => Self::Generation(other.to_string()),
        }
    }

    /// Classify a gateway failure that happened while building a share link
    #[must_use]
    pub fn from_share(error: GatewayError) -> Self {
        Self::LinkGeneration(error.to_string())
    }

    /// Whether this error indicates a bug in the caller rather than a user-facing failure
    #[must_use]
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}

impl From<CaptureError> for TryOnError {
    fn from(error: CaptureError) -> Self {
        match error {
            CaptureError::UnsupportedMediaType { found, .. } => {
                Self::UnsupportedMediaType { media_type: found }
            }
            other => Self::Recoverable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_classification() {
        let transport = GatewayError::Transport {
            endpoint: "/api/tryon".to_string(),
            message: "connection refused".to_string(),
            timeout: false,
        };
        assert!(matches!(
            TryOnError::from_generation(transport),
            TryOnError::Network(_)
        ));

        let missing = GatewayError::MissingField {
            endpoint: "/api/tryon".to_string(),
            field: "result_image_base64",
        };
        assert!(matches!(
            TryOnError::from_generation(missing),
            TryOnError::Generation(_)
        ));
    }

    #[test]
    fn test_capture_errors_convert() {
        let unsupported = CaptureError::UnsupportedMediaType {
            file_name: "notes.pdf".to_string(),
            found: "application/pdf".to_string(),
        };
        assert!(matches!(
            TryOnError::from(unsupported),
            TryOnError::UnsupportedMediaType { media_type } if media_type == "application/pdf"
        ));

        let unreadable = CaptureError::Encoding("truncated".to_string());
        assert!(matches!(
            TryOnError::from(unreadable),
            TryOnError::Recoverable(_)
        ));
    }

    #[test]
    fn test_only_transitions_are_programmer_errors() {
        let err = TryOnError::InvalidTransition {
            stage: WorkflowStage::SelectOutfit,
            action: "generate",
        };
        assert!(err.is_programmer_error());
        assert!(!TryOnError::EmptyCatalog.is_programmer_error());
        assert_eq!(
            err.to_string(),
            "Cannot generate while in stage select-outfit"
        );
    }
}
