//! Try-On Core - Headless Virtual Try-On Workflow for the Pet Outfit Storefront
//!
//! This crate holds the client-side workflow of the storefront: pick an outfit,
//! upload a photo of the pet, have the backend generate the pet wearing it, and
//! present the result. It is independent of any UI framework and can drive a
//! web page, the CLI, or run headless in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        UI Surfaces                           │
//! │        ┌─────────┐    ┌─────────┐    ┌──────────────┐        │
//! │        │   CLI   │    │   Web   │    │ Test harness │        │
//! │        └────┬────┘    └────┬────┘    └──────┬───────┘        │
//! │             └──────────────┼────────────────┘                │
//! │                     SurfaceEvent (up)                        │
//! │                  ControllerMessage (down)                    │
//! └────────────────────────────┼─────────────────────────────────┘
//!                              │
//! ┌────────────────────────────┼─────────────────────────────────┐
//! │                       TRY-ON CORE                            │
//! │  ┌─────────────────────────┴──────────────────────────────┐  │
//! │  │                   TryOnController                      │  │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────────┐  │  │
//! │  │  │ Catalog  │ │ Capture  │ │ Session  │ │ Presenter │  │  │
//! │  │  └──────────┘ └──────────┘ └──────────┘ └───────────┘  │  │
//! │  └─────────────────────────┬──────────────────────────────┘  │
//! │                     TryOnBackend (HTTP)                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`TryOnController`]: owns the session and drives the workflow
//! - [`TryOnSession`]: chosen outfit, photo, customer name, result, stage
//! - [`WorkflowStage`]: `SelectOutfit` → `CapturePhoto` → `Generating` → `ResultReady`
//! - [`HttpBackend`]: the REST gateway to the try-on service
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tryon_core::{
//!     ControllerConfig, HttpBackend, OutfitSelector, RawFile, RemoteCatalog,
//!     SurfaceEvent, TryOnController,
//! };
//! use tokio::sync::mpsc;
//!
//! let (tx, mut rx) = mpsc::channel(100);
//! let backend = Arc::new(HttpBackend::new("http://localhost:8001", None)?);
//! let catalog = RemoteCatalog::new(Arc::clone(&backend));
//! let mut controller = TryOnController::new(backend, catalog, ControllerConfig::default(), tx);
//!
//! controller.start().await;
//! controller.handle_event(SurfaceEvent::connected()).await?;
//! controller.handle_event(SurfaceEvent::outfit_chosen(OutfitSelector::ByNumber(3))).await?;
//!
//! let photo = RawFile::from_path("dog.png".as_ref()).await?;
//! controller.handle_event(SurfaceEvent::photo_submitted(vec![photo])).await?;
//! let result_id = controller.wait_generation().await;
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: gateway trait and HTTP implementation
//! - [`capture`]: photo validation and base64 encoding
//! - [`catalog`]: outfit sources and catalog state
//! - [`config`]: TOML / environment / CLI configuration
//! - [`controller`]: the workflow controller
//! - [`error`]: workflow error taxonomy
//! - [`events`]: events from UI surfaces
//! - [`messages`]: messages to UI surfaces
//! - [`presenter`]: result export and sharing
//! - [`progress`]: progress lines while generating
//! - [`session`]: session state and transitions

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod messages;
pub mod presenter;
pub mod progress;
pub mod session;

// Re-exports for convenience
pub use backend::{
    AdminBackend, AdminCredentials, GatewayError, GenerationRequest, GenerationResult,
    HttpBackend, RemoteOutfit, ShareLink, TryOnBackend, TryOnRecord, UploadSummary,
};
pub use capture::{CaptureError, CaptureOutcome, CapturedImage, ImageCapture, MediaType, RawFile};
pub use catalog::{
    CatalogSource, CatalogState, ImageReference, OutfitId, OutfitItem, OutfitReference,
    OutfitSelector, RemoteCatalog, StaticCatalog,
};
pub use controller::{ControllerConfig, TryOnController};
pub use error::TryOnError;
pub use events::SurfaceEvent;
pub use messages::{ControllerMessage, EventId, NotifyLevel, SessionId, TryOnId, WorkflowStage};
pub use presenter::{export_file_name, ResultPresenter};
pub use progress::{ProgressTicker, ProgressUpdate};
pub use session::{TryOnResult, TryOnSession};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, BackendSettings, CatalogSourceKind,
    ConfigError, ConfigOverrides, ConfigSource, TryOnConfig,
};
