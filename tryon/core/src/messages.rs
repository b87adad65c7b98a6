//! Controller Messages
//!
//! Messages sent from the try-on controller to UI surfaces. A surface (web page,
//! CLI, test harness) renders what it is told and nothing more.
//!
//! # Design Philosophy
//!
//! The controller owns the whole workflow. Surfaces never read or mutate the
//! session directly; everything they need to draw arrives here, which keeps
//! every surface consistent with the single state machine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capture::MediaType;
use crate::catalog::{CatalogState, OutfitItem};

/// Messages from the controller to a UI surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ControllerMessage {
    // ============================================
    // Session Lifecycle
    // ============================================
    /// Session information, sent when a surface connects
    SessionInfo {
        /// Session ID
        session_id: SessionId,
        /// Backend the session talks to
        backend: String,
    },

    /// The workflow moved to a new stage
    Stage {
        /// The stage now active
        stage: WorkflowStage,
    },

    /// Request surface to quit
    Quit {
        /// Optional goodbye message
        message: Option<String>,
    },

    // ============================================
    // Catalog
    // ============================================
    /// The catalog finished loading (or failed to)
    Catalog {
        /// Loaded, empty, or failed
        state: CatalogState,
    },

    /// The user picked an outfit
    OutfitSelected {
        /// The chosen item
        outfit: OutfitItem,
    },

    // ============================================
    // Capture / Generation
    // ============================================
    /// A photo was accepted and encoded
    PhotoCaptured {
        /// Original file name
        file_name: String,
        /// Detected media type
        media_type: MediaType,
        /// Displayable data URL
        preview: String,
        /// Files beyond the first that were dropped
        ignored_files: usize,
    },

    /// Interim progress while a generation is in flight
    Progress {
        /// Human-readable progress line
        message: String,
        /// 1-based index of this message
        step: usize,
        /// Total number of messages in the schedule
        total: usize,
    },

    /// Generation finished and the result is ready to show
    ResultReady {
        /// Backend identifier of the try-on result
        result_id: TryOnId,
        /// Name of the outfit that was applied
        outfit_name: Option<String>,
        /// Data URL of the submitted photo, for before/after views
        before_preview: Option<String>,
        /// Displayable data URL of the generated image
        preview: String,
        /// Message the backend sent along with the result
        message: Option<String>,
    },

    // ============================================
    // Result Actions
    // ============================================
    /// The result image was written to disk
    Exported {
        /// Where the file landed
        path: PathBuf,
    },

    /// A share link was generated
    ShareLink {
        /// Link to open
        url: String,
        /// Prefilled message text, if the backend sent one
        message: Option<String>,
    },

    // ============================================
    // System Messages
    // ============================================
    /// User-visible notification
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Message content
        message: String,
    },

    /// Acknowledgment of received event
    Ack {
        /// Event ID being acknowledged
        event_id: EventId,
    },
}

/// Event identifier (for acks)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

/// Session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new unique session ID
    pub fn new() -> Self {
        Self(format!("session_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier the backend assigns to a generated try-on
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TryOnId(pub String);

impl std::fmt::Display for TryOnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
    /// Success
    Success,
}

/// Stages of the try-on workflow. Exactly one is active per session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStage {
    /// Browsing the catalog, no outfit chosen yet
    SelectOutfit,
    /// Outfit chosen, waiting for a photo (or a retry)
    CapturePhoto,
    /// A generation request is in flight
    Generating,
    /// The generated image is available
    ResultReady,
}

impl WorkflowStage {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::SelectOutfit => "Choose an outfit",
            Self::CapturePhoto => "Upload a photo of your pet",
            Self::Generating => "Creating your image...",
            Self::ResultReady => "Your try-on is ready",
        }
    }

    /// 1-based position in the happy path, for "step N of 4" displays
    #[must_use]
    pub fn step_number(&self) -> u8 {
        match self {
            Self::SelectOutfit => 1,
            Self::CapturePhoto => 2,
            Self::Generating => 3,
            Self::ResultReady => 4,
        }
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SelectOutfit => "select-outfit",
            Self::CapturePhoto => "capture-photo",
            Self::Generating => "generating",
            Self::ResultReady => "result-ready",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
        assert!(id1.0.starts_with("session_"));
    }

    #[test]
    fn test_stage_description() {
        assert_eq!(WorkflowStage::SelectOutfit.description(), "Choose an outfit");
        assert_eq!(WorkflowStage::ResultReady.step_number(), 4);
        assert_eq!(WorkflowStage::Generating.to_string(), "generating");
    }

    #[test]
    fn test_tryon_id_is_transparent_on_the_wire() {
        let id = TryOnId("abc".to_string());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
