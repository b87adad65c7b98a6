//! Surface Events
//!
//! Events sent from UI surfaces to the try-on controller. A surface only
//! reports what the user did; the controller decides what it means for the
//! workflow and answers with [`ControllerMessage`](crate::messages::ControllerMessage)s.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capture::RawFile;
use crate::catalog::OutfitSelector;
use crate::messages::EventId;

/// Events from a UI surface to the controller
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SurfaceEvent {
    // ============================================
    // Connection Events
    // ============================================
    /// Surface attached to the controller
    Connected {
        /// Event ID for acknowledgment
        event_id: EventId,
    },

    /// Surface wants to leave
    QuitRequested {
        /// Event ID for acknowledgment
        event_id: EventId,
    },

    // ============================================
    // Workflow Events
    // ============================================
    /// (Re)load the catalog
    CatalogRequested {
        /// Event ID for acknowledgment
        event_id: EventId,
    },

    /// User picked an outfit
    OutfitChosen {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// Which outfit
        selector: OutfitSelector,
    },

    /// User typed (or cleared) their name
    CustomerNameChanged {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// New name; `None` or blank clears it
        name: Option<String>,
    },

    /// User dropped or picked one or more files
    PhotoSubmitted {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// Files in the order received; only the first is used
        files: Vec<RawFile>,
    },

    /// Retry generation with the photo already captured
    GenerateRequested {
        /// Event ID for acknowledgment
        event_id: EventId,
    },

    /// Step back one stage
    BackRequested {
        /// Event ID for acknowledgment
        event_id: EventId,
    },

    /// Start over
    ResetRequested {
        /// Event ID for acknowledgment
        event_id: EventId,
    },

    // ============================================
    // Result Events
    // ============================================
    /// Save the result image
    ExportRequested {
        /// Event ID for acknowledgment
        event_id: EventId,
        /// Target directory; the configured export directory when `None`
        directory: Option<PathBuf>,
    },

    /// Produce a share link for the result
    ShareRequested {
        /// Event ID for acknowledgment
        event_id: EventId,
    },
}

impl SurfaceEvent {
    /// Generate a new event ID for this event
    pub fn new_event_id() -> EventId {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        EventId(format!("evt_{id}"))
    }

    /// The event ID to acknowledge
    pub fn event_id(&self) -> &EventId {
        match self {
            Self::Connected { event_id }
            | Self::QuitRequested { event_id }
            | Self::CatalogRequested { event_id }
            | Self::OutfitChosen { event_id, .. }
            | Self::CustomerNameChanged { event_id, .. }
            | Self::PhotoSubmitted { event_id, .. }
            | Self::GenerateRequested { event_id }
            | Self::BackRequested { event_id }
            | Self::ResetRequested { event_id }
            | Self::ExportRequested { event_id, .. }
            | Self::ShareRequested { event_id } => event_id,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::QuitRequested { .. } => "quit",
            Self::CatalogRequested { .. } => "catalog",
            Self::OutfitChosen { .. } => "outfit-chosen",
            Self::CustomerNameChanged { .. } => "customer-name",
            Self::PhotoSubmitted { .. } => "photo-submitted",
            Self::GenerateRequested { .. } => "generate",
            Self::BackRequested { .. } => "back",
            Self::ResetRequested { .. } => "reset",
            Self::ExportRequested { .. } => "export",
            Self::ShareRequested { .. } => "share",
        }
    }

    // Convenience constructors, one fresh event ID each

    /// Surface attached
    pub fn connected() -> Self {
        Self::Connected {
            event_id: Self::new_event_id(),
        }
    }

    /// Reload the catalog
    pub fn catalog_requested() -> Self {
        Self::CatalogRequested {
            event_id: Self::new_event_id(),
        }
    }

    /// Pick an outfit
    pub fn outfit_chosen(selector: OutfitSelector) -> Self {
        Self::OutfitChosen {
            event_id: Self::new_event_id(),
            selector,
        }
    }

    /// Set the customer name
    pub fn customer_name(name: Option<String>) -> Self {
        Self::CustomerNameChanged {
            event_id: Self::new_event_id(),
            name,
        }
    }

    /// Submit photos
    pub fn photo_submitted(files: Vec<RawFile>) -> Self {
        Self::PhotoSubmitted {
            event_id: Self::new_event_id(),
            files,
        }
    }

    /// Retry generation
    pub fn generate() -> Self {
        Self::GenerateRequested {
            event_id: Self::new_event_id(),
        }
    }

    /// Step back
    pub fn back() -> Self {
        Self::BackRequested {
            event_id: Self::new_event_id(),
        }
    }

    /// Start over
    pub fn reset() -> Self {
        Self::ResetRequested {
            event_id: Self::new_event_id(),
        }
    }

    /// Save the result
    pub fn export(directory: Option<PathBuf>) -> Self {
        Self::ExportRequested {
            event_id: Self::new_event_id(),
            directory,
        }
    }

    /// Share the result
    pub fn share() -> Self {
        Self::ShareRequested {
            event_id: Self::new_event_id(),
        }
    }

    /// Leave
    pub fn quit() -> Self {
        Self::QuitRequested {
            event_id: Self::new_event_id(),
        }
    }
}
