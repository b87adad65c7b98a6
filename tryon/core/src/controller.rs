//! Try-On Controller - The Workflow Core
//!
//! The controller owns the one [`TryOnSession`] and drives it:
//! - catalog loading through a [`CatalogSource`]
//! - photo capture through [`ImageCapture`]
//! - generation through a [`TryOnBackend`]
//! - progress lines while a generation is in flight
//! - export and share through [`ResultPresenter`]
//!
//! # Design Philosophy
//!
//! The controller is UI-agnostic. It doesn't know whether it's talking to a
//! web page, the CLI, or a test harness. It communicates through:
//! - `ControllerMessage`: what the surface should show
//! - `SurfaceEvent`: what the user did
//!
//! # Generation
//!
//! At most one generation is in flight per session. The backend call runs on
//! its own task and reports back through a oneshot channel; a second request
//! while one is pending is rejected with [`TryOnError::GenerationInFlight`].
//! There is no cancellation: once sent, a request runs to completion.
//!
//! Surfaces drive completion either by calling [`TryOnController::poll_generation`]
//! regularly or by awaiting [`TryOnController::wait_generation`]. Either way the
//! result is applied as soon as it arrives and the progress ticker is dropped,
//! regardless of how many progress lines have been shown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::backend::{GatewayError, GenerationResult, TryOnBackend};
use crate::capture::{ImageCapture, RawFile};
use crate::catalog::{CatalogSource, CatalogState, OutfitSelector};
use crate::config::TryOnConfig;
use crate::error::TryOnError;
use crate::events::SurfaceEvent;
use crate::messages::{ControllerMessage, EventId, NotifyLevel, SessionId, TryOnId, WorkflowStage};
use crate::presenter::ResultPresenter;
use crate::progress::{ProgressTicker, ProgressUpdate};
use crate::session::{TryOnResult, TryOnSession};

/// Controller configuration
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Progress lines shown while generating
    pub progress_messages: Vec<String>,
    /// Time between progress lines
    pub progress_interval: Duration,
    /// Maximum customer name length in characters
    pub max_customer_name_len: usize,
    /// Largest accepted photo in bytes
    pub max_photo_bytes: u64,
    /// Default export directory
    pub export_dir: PathBuf,
    /// Whether a connecting surface triggers a catalog load
    pub load_catalog_on_connect: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_config(&TryOnConfig::default())
    }
}

impl ControllerConfig {
    /// Take the controller-relevant parts of a loaded configuration
    #[must_use]
    pub fn from_config(config: &TryOnConfig) -> Self {
        Self {
            progress_messages: config.progress.messages.clone(),
            progress_interval: config.progress.interval,
            max_customer_name_len: config.session.max_customer_name_len,
            max_photo_bytes: config.session.max_photo_bytes,
            export_dir: config.session.export_dir.clone(),
            load_catalog_on_connect: true,
        }
    }
}

/// A generation waiting for its response
struct InFlightGeneration {
    /// Resolves once with the backend's answer
    rx: oneshot::Receiver<Result<GenerationResult, GatewayError>>,
    /// Cosmetic progress; dropped with this struct
    progress: ProgressTicker,
    /// When the request was sent
    started: tokio::time::Instant,
}

/// What woke up [`TryOnController::wait_generation`]
enum GenerationWake {
    Done(Result<Result<GenerationResult, GatewayError>, oneshot::error::RecvError>),
    Progress(ProgressUpdate),
}

/// The try-on controller - headless workflow core
pub struct TryOnController<B: TryOnBackend, C: CatalogSource> {
    /// Configuration
    config: ControllerConfig,
    /// Backend gateway
    backend: Arc<B>,
    /// Where outfits come from
    catalog_source: C,
    /// Last catalog load outcome
    catalog: CatalogState,
    /// Photo validation
    capture: ImageCapture,
    /// The session being driven
    session: TryOnSession,
    /// Channel to send messages to the UI surface
    tx: mpsc::Sender<ControllerMessage>,
    /// Pending generation, if any
    in_flight: Option<InFlightGeneration>,
    /// Set once the surface asked to quit
    quit_requested: bool,
}

impl<B: TryOnBackend + 'static, C: CatalogSource> TryOnController<B, C> {
    /// Create a controller
    pub fn new(
        backend: Arc<B>,
        catalog_source: C,
        config: ControllerConfig,
        tx: mpsc::Sender<ControllerMessage>,
    ) -> Self {
        let capture = ImageCapture::new(config.max_photo_bytes);
        Self {
            config,
            backend,
            catalog_source,
            catalog: CatalogState::NotLoaded,
            capture,
            session: TryOnSession::new(),
            tx,
            in_flight: None,
            quit_requested: false,
        }
    }

    /// Get the session ID
    pub fn session_id(&self) -> &SessionId {
        self.session.id()
    }

    /// Read-only view of the session
    pub fn session(&self) -> &TryOnSession {
        &self.session
    }

    /// Current stage
    pub fn stage(&self) -> WorkflowStage {
        self.session.stage()
    }

    /// Last catalog load outcome
    pub fn catalog(&self) -> &CatalogState {
        &self.catalog
    }

    /// Whether a generation is in flight
    pub fn is_generating(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the surface asked to quit
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Start the controller: check the backend and announce the session
    pub async fn start(&mut self) {
        if !self.backend.health_check().await {
            tracing::warn!(backend = self.backend.name(), "Backend health check failed");
            self.notify(
                NotifyLevel::Warning,
                "Try-on service is not reachable right now",
            )
            .await;
        }

        self.send_session_info().await;
        self.announce_stage().await;
    }

    /// Handle an event from the UI surface
    ///
    /// Every event is acknowledged. A rejected event is also reported to the
    /// surface as a notification before the error is returned; the session is
    /// left in the state it was in before the event.
    ///
    /// # Errors
    ///
    /// The [`TryOnError`] that caused the event to be rejected.
    pub async fn handle_event(&mut self, event: SurfaceEvent) -> Result<(), TryOnError> {
        let kind = event.kind();
        self.ack(event.event_id().clone()).await;

        let outcome = self.dispatch(event).await;
        if let Err(ref e) = outcome {
            tracing::warn!(
                event = kind,
                stage = %self.session.stage(),
                reason = %e,
                "Rejected surface event"
            );
            self.notify(level_for(e), &e.to_string()).await;
        }
        outcome
    }

    async fn dispatch(&mut self, event: SurfaceEvent) -> Result<(), TryOnError> {
        match event {
            SurfaceEvent::Connected { .. } => {
                self.send_session_info().await;
                self.announce_stage().await;
                if self.config.load_catalog_on_connect {
                    self.load_catalog().await?;
                }
            }

            SurfaceEvent::QuitRequested { .. } => {
                if self.in_flight.is_some() {
                    tracing::info!("Quitting with a generation still in flight");
                }
                self.quit_requested = true;
                self.send(ControllerMessage::Quit {
                    message: Some("Goodbye!".to_string()),
                })
                .await;
            }

            SurfaceEvent::CatalogRequested { .. } => self.load_catalog().await?,

            SurfaceEvent::OutfitChosen { selector, .. } => self.choose_outfit(&selector).await?,

            SurfaceEvent::CustomerNameChanged { name, .. } => {
                self.session
                    .set_customer_name(name.as_deref(), self.config.max_customer_name_len)?;
            }

            SurfaceEvent::PhotoSubmitted { files, .. } => self.submit_photo(files).await?,

            SurfaceEvent::GenerateRequested { .. } => self.begin_generation().await?,

            SurfaceEvent::BackRequested { .. } => {
                let before = self.session.stage();
                let after = self.session.back()?;
                if before != after {
                    self.announce_stage().await;
                }
            }

            SurfaceEvent::ResetRequested { .. } => {
                self.session.reset()?;
                self.announce_stage().await;
            }

            SurfaceEvent::ExportRequested { directory, .. } => {
                let dir = directory.unwrap_or_else(|| self.config.export_dir.clone());
                let path = ResultPresenter::new(&self.session)?
                    .export_as_file(&dir)
                    .await?;
                self.send(ControllerMessage::Exported { path }).await;
            }

            SurfaceEvent::ShareRequested { .. } => {
                let link = ResultPresenter::new(&self.session)?
                    .build_share_link(self.backend.as_ref())
                    .await?;
                self.send(ControllerMessage::ShareLink {
                    url: link.url,
                    message: link.message,
                })
                .await;
            }
        }
        Ok(())
    }

    /// Load the catalog and tell the surface how it went
    async fn load_catalog(&mut self) -> Result<(), TryOnError> {
        tracing::debug!(source = %self.catalog_source.describe(), "Loading catalog");

        match self.catalog_source.load_catalog().await {
            Ok(items) => {
                self.catalog = CatalogState::from_items(items);
                tracing::info!(count = self.catalog.len(), "Catalog loaded");
                self.send(ControllerMessage::Catalog {
                    state: self.catalog.clone(),
                })
                .await;
                if self.catalog.is_empty() {
                    self.notify(NotifyLevel::Info, &TryOnError::EmptyCatalog.to_string())
                        .await;
                }
                Ok(())
            }
            Err(e) => {
                self.catalog = CatalogState::Failed(e.to_string());
                self.send(ControllerMessage::Catalog {
                    state: self.catalog.clone(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn choose_outfit(&mut self, selector: &OutfitSelector) -> Result<(), TryOnError> {
        let outfit = self.catalog.resolve(selector)?.clone();
        self.session.select_outfit(outfit.clone())?;

        tracing::info!(outfit = %outfit.id, reference = %outfit.reference(), "Outfit selected");
        self.send(ControllerMessage::OutfitSelected { outfit }).await;
        self.announce_stage().await;
        Ok(())
    }

    /// Capture a photo and, if it is valid, start generating straight away
    async fn submit_photo(&mut self, files: Vec<RawFile>) -> Result<(), TryOnError> {
        match self.session.stage() {
            WorkflowStage::CapturePhoto => {}
            WorkflowStage::Generating => return Err(TryOnError::GenerationInFlight),
            stage => {
                return Err(TryOnError::InvalidTransition {
                    stage,
                    action: "submit a photo",
                })
            }
        }

        let outcome = self.capture.capture(files)?;
        let image = outcome.image;
        self.session.attach_image(image.clone())?;
        tracing::debug!(
            session = %self.session.id(),
            bytes = image.byte_len(),
            "Photo attached"
        );

        self.send(ControllerMessage::PhotoCaptured {
            file_name: image.file_name,
            media_type: image.media_type,
            preview: image.preview,
            ignored_files: outcome.ignored_files,
        })
        .await;

        if outcome.ignored_files > 0 {
            self.notify(
                NotifyLevel::Info,
                &format!(
                    "Only one photo can be used; {} other file(s) were ignored",
                    outcome.ignored_files
                ),
            )
            .await;
        }

        self.begin_generation().await
    }

    /// Send the generation request and start the progress ticker
    async fn begin_generation(&mut self) -> Result<(), TryOnError> {
        if self.in_flight.is_some() {
            return Err(TryOnError::GenerationInFlight);
        }
        let request = self.session.begin_generation()?;

        tracing::info!(
            session = %self.session.id(),
            outfit = %request.outfit,
            photo_bytes = request.image_base64.len(),
            "Starting generation"
        );

        let (result_tx, rx) = oneshot::channel();
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            let result = backend.generate(&request).await;
            let _ = result_tx.send(result);
        });

        self.in_flight = Some(InFlightGeneration {
            rx,
            progress: ProgressTicker::start(
                self.config.progress_messages.clone(),
                self.config.progress_interval,
            ),
            started: tokio::time::Instant::now(),
        });
        self.announce_stage().await;
        Ok(())
    }

    /// Check on the in-flight generation without waiting
    ///
    /// Forwards any progress lines already emitted and applies the response if
    /// it has arrived. Returns true if there was activity.
    pub async fn poll_generation(&mut self) -> bool {
        let (updates, done) = {
            let Some(in_flight) = self.in_flight.as_mut() else {
                return false;
            };

            let mut updates = Vec::new();
            while let Some(update) = in_flight.progress.try_next() {
                updates.push(update);
            }

            let done = match in_flight.rx.try_recv() {
                Ok(result) => Some(Ok(result)),
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => Some(Err(())),
            };
            (updates, done)
        };

        let activity = !updates.is_empty() || done.is_some();

        if let Some(done) = done {
            // Progress that lost the race with the response is not shown
            self.finish_generation(done.map_err(|()| lost_task())).await;
        } else {
            for update in updates {
                self.send_progress(update).await;
            }
        }

        activity
    }

    /// Wait for the in-flight generation to finish, forwarding progress meanwhile
    ///
    /// Returns `None` if nothing was in flight, otherwise the result id or the
    /// error that sent the session back to `CapturePhoto`.
    pub async fn wait_generation(&mut self) -> Option<Result<TryOnId, TryOnError>> {
        loop {
            let in_flight = self.in_flight.as_mut()?;

            let wake = tokio::select! {
                biased;
                result = &mut in_flight.rx => GenerationWake::Done(result),
                Some(update) = in_flight.progress.next() => GenerationWake::Progress(update),
            };

            match wake {
                GenerationWake::Progress(update) => self.send_progress(update).await,
                GenerationWake::Done(result) => {
                    let result = result.map_err(|_| lost_task());
                    return Some(self.finish_generation(result).await);
                }
            }
        }
    }

    /// Apply a generation response to the session
    async fn finish_generation(
        &mut self,
        response: Result<Result<GenerationResult, GatewayError>, TryOnError>,
    ) -> Result<TryOnId, TryOnError> {
        let elapsed_ms = self
            .in_flight
            .take()
            .map_or(0, |f| {
                f.progress.cancel();
                u64::try_from(f.started.elapsed().as_millis()).unwrap_or(u64::MAX)
            });

        let outcome = response
            .and_then(|r| r.map_err(TryOnError::from_generation))
            .and_then(TryOnResult::try_from);

        match outcome {
            Ok(result) => {
                self.session.complete_generation(result)?;

                let presenter = ResultPresenter::new(&self.session)?;
                let result_id = presenter.result_id().clone();
                let ready = ControllerMessage::ResultReady {
                    result_id: result_id.clone(),
                    outfit_name: presenter.outfit().map(|outfit| outfit.name.clone()),
                    before_preview: presenter.before_preview().map(str::to_string),
                    preview: presenter.after_preview(),
                    message: presenter.message().map(str::to_string),
                };

                tracing::info!(
                    session = %self.session.id(),
                    result_id = %result_id,
                    elapsed_ms,
                    "Generation complete"
                );
                self.announce_stage().await;
                self.send(ready).await;
                Ok(result_id)
            }
            Err(e) => {
                self.session.fail_generation()?;

                tracing::warn!(
                    session = %self.session.id(),
                    reason = %e,
                    elapsed_ms,
                    "Generation failed, back to photo capture"
                );
                self.announce_stage().await;
                self.notify(
                    NotifyLevel::Error,
                    &format!("{e}. Your photo and outfit are kept, you can try again."),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Shut down the controller
    ///
    /// An in-flight generation is not cancelled; its result is discarded.
    pub async fn shutdown(&mut self) {
        self.in_flight = None;
        self.send(ControllerMessage::Quit {
            message: Some("Goodbye!".to_string()),
        })
        .await;
    }

    async fn send_session_info(&self) {
        self.send(ControllerMessage::SessionInfo {
            session_id: self.session.id().clone(),
            backend: self.backend.name().to_string(),
        })
        .await;
    }

    async fn send_progress(&self, update: ProgressUpdate) {
        self.send(ControllerMessage::Progress {
            message: update.message,
            step: update.step,
            total: update.total,
        })
        .await;
    }

    /// Tell the surface which stage is active
    async fn announce_stage(&self) {
        let stage = self.session.stage();
        tracing::info!(session = %self.session.id(), stage = %stage, "Workflow stage");
        self.send(ControllerMessage::Stage { stage }).await;
    }

    /// Send acknowledgment
    async fn ack(&self, event_id: EventId) {
        self.send(ControllerMessage::Ack { event_id }).await;
    }

    /// Send notification
    async fn notify(&self, level: NotifyLevel, message: &str) {
        self.send(ControllerMessage::Notify {
            level,
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the UI surface
    async fn send(&self, msg: ControllerMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

fn lost_task() -> TryOnError {
    TryOnError::Generation("generation task ended without a response".to_string())
}

/// How loudly to report a rejected event
fn level_for(error: &TryOnError) -> NotifyLevel {
    match error {
        TryOnError::EmptyCatalog => NotifyLevel::Info,
        TryOnError::UnsupportedMediaType { .. }
        | TryOnError::InvalidInput(_)
        | TryOnError::UnknownOutfit(_)
        | TryOnError::GenerationInFlight
        | TryOnError::InvalidTransition { .. } => NotifyLevel::Warning,
        _ => NotifyLevel::Error,
    }
}
