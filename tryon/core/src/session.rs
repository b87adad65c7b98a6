//! Try-On Session
//!
//! The transient state of one user's workflow: the chosen outfit, the captured
//! photo, an optional customer name, and the generated result. Only the
//! controller holds a `TryOnSession`; every mutation goes through a method
//! here that checks the current [`WorkflowStage`] first.
//!
//! # Transitions
//!
//! ```text
//! SelectOutfit  --select_outfit-->        CapturePhoto
//! CapturePhoto  --begin_generation-->     Generating
//! Generating    --complete_generation-->  ResultReady
//! Generating    --fail_generation-->      CapturePhoto   (outfit + photo kept)
//! ResultReady   --reset-->                SelectOutfit
//! CapturePhoto  --back-->                 SelectOutfit   (outfit + photo dropped)
//! ResultReady   --back-->                 CapturePhoto   (result + photo dropped)
//! ```
//!
//! Nothing may leave `Generating` except its completion: `back` and `reset`
//! are rejected while a request is in flight.

use chrono::{DateTime, Utc};

use crate::backend::{GenerationRequest, GenerationResult};
use crate::capture::{self, CapturedImage};
use crate::catalog::OutfitItem;
use crate::error::TryOnError;
use crate::messages::{SessionId, TryOnId, WorkflowStage};

/// A generated try-on image
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TryOnResult {
    /// Backend identifier
    pub id: TryOnId,
    /// Standard base64 of the image
    pub image_base64: String,
    /// MIME type sniffed from the decoded bytes
    pub media_type: &'static str,
    /// Optional backend message
    pub message: Option<String>,
}

impl TryOnResult {
    /// Validate a generated image
    ///
    /// # Errors
    ///
    /// [`TryOnError::Generation`] if the payload is empty or not valid base64.
    pub fn new(
        id: TryOnId,
        image_base64: String,
        message: Option<String>,
    ) -> Result<Self, TryOnError> {
        let bytes = capture::decode_base64(&image_base64)
            .map_err(|e| TryOnError::Generation(format!("result image: {e}")))?;
        if bytes.is_empty() {
            return Err(TryOnError::Generation("result image is empty".to_string()));
        }

        Ok(Self {
            id,
            media_type: capture::sniff_mime(&bytes),
            image_base64,
            message,
        })
    }

    /// `data:` URL for display
    #[must_use]
    pub fn preview(&self) -> String {
        if self.image_base64.starts_with("data:") {
            return self.image_base64.clone();
        }
        capture::data_url(self.media_type, &self.image_base64)
    }

    /// Decoded image bytes
    ///
    /// # Errors
    ///
    /// [`TryOnError::Export`] if the payload cannot be decoded.
    pub fn decode(&self) -> Result<Vec<u8>, TryOnError> {
        capture::decode_base64(&self.image_base64).map_err(|e| TryOnError::Export(e.to_string()))
    }
}

impl TryFrom<GenerationResult> for TryOnResult {
    type Error = TryOnError;

    fn try_from(result: GenerationResult) -> Result<Self, Self::Error> {
        Self::new(result.id, result.result_image_base64, result.message)
    }
}

/// One user's in-progress workflow
#[derive(Clone, Debug)]
pub struct TryOnSession {
    id: SessionId,
    stage: WorkflowStage,
    selected_outfit: Option<OutfitItem>,
    captured_image: Option<CapturedImage>,
    customer_name: Option<String>,
    result: Option<TryOnResult>,
    started_at: DateTime<Utc>,
}

impl Default for TryOnSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TryOnSession {
    /// Create a session at `SelectOutfit`
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Create a session with a specific ID
    #[must_use]
    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            stage: WorkflowStage::SelectOutfit,
            selected_outfit: None,
            captured_image: None,
            customer_name: None,
            result: None,
            started_at: Utc::now(),
        }
    }

    /// Session ID
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current stage
    #[must_use]
    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    /// Chosen outfit
    #[must_use]
    pub fn selected_outfit(&self) -> Option<&OutfitItem> {
        self.selected_outfit.as_ref()
    }

    /// Captured photo
    #[must_use]
    pub fn captured_image(&self) -> Option<&CapturedImage> {
        self.captured_image.as_ref()
    }

    /// Customer name, already trimmed
    #[must_use]
    pub fn customer_name(&self) -> Option<&str> {
        self.customer_name.as_deref()
    }

    /// Generated result
    #[must_use]
    pub fn result(&self) -> Option<&TryOnResult> {
        self.result.as_ref()
    }

    /// When the session (or its last reset) started
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether a generation is in flight
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.stage == WorkflowStage::Generating
    }

    fn reject(&self, action: &'static str) -> TryOnError {
        TryOnError::InvalidTransition {
            stage: self.stage,
            action,
        }
    }

    /// Choose an outfit; also allowed from `CapturePhoto` to change the choice
    ///
    /// # Errors
    ///
    /// [`TryOnError::InvalidTransition`] while generating or showing a result.
    pub fn select_outfit(&mut self, outfit: OutfitItem) -> Result<(), TryOnError> {
        match self.stage {
            WorkflowStage::SelectOutfit | WorkflowStage::CapturePhoto => {
                self.selected_outfit = Some(outfit);
                self.stage = WorkflowStage::CapturePhoto;
                Ok(())
            }
            WorkflowStage::Generating | WorkflowStage::ResultReady => {
                Err(self.reject("select an outfit"))
            }
        }
    }

    /// Set or clear the customer name
    ///
    /// # Errors
    ///
    /// [`TryOnError::InvalidInput`] if longer than `max_len` characters,
    /// [`TryOnError::InvalidTransition`] while generating.
    pub fn set_customer_name(
        &mut self,
        name: Option<&str>,
        max_len: usize,
    ) -> Result<(), TryOnError> {
        if self.is_generating() {
            return Err(self.reject("change the customer name"));
        }

        let name = name.map(str::trim).filter(|n| !n.is_empty());
        if let Some(name) = name {
            let len = name.chars().count();
            if len > max_len {
                return Err(TryOnError::InvalidInput(format!(
                    "customer name is {len} characters (max {max_len})"
                )));
            }
        }
        self.customer_name = name.map(String::from);
        Ok(())
    }

    /// Store a captured photo, replacing any previous one
    ///
    /// # Errors
    ///
    /// [`TryOnError::InvalidTransition`] outside `CapturePhoto`.
    pub fn attach_image(&mut self, image: CapturedImage) -> Result<(), TryOnError> {
        if self.stage != WorkflowStage::CapturePhoto {
            return Err(self.reject("attach a photo"));
        }
        self.captured_image = Some(image);
        Ok(())
    }

    /// Enter `Generating` and build the request to send
    ///
    /// # Errors
    ///
    /// [`TryOnError::GenerationInFlight`] if already generating, otherwise
    /// [`TryOnError::InvalidTransition`] unless in `CapturePhoto` with both an
    /// outfit and a photo.
    pub fn begin_generation(&mut self) -> Result<GenerationRequest, TryOnError> {
        if self.is_generating() {
            return Err(TryOnError::GenerationInFlight);
        }
        if self.stage != WorkflowStage::CapturePhoto {
            return Err(self.reject("generate"));
        }

        let (Some(outfit), Some(image)) = (&self.selected_outfit, &self.captured_image) else {
            return Err(self.reject("generate without an outfit and a photo"));
        };

        let request = GenerationRequest {
            image_base64: image.encoded.clone(),
            outfit: outfit.reference(),
            customer_name: self.customer_name.clone(),
        };
        self.stage = WorkflowStage::Generating;
        Ok(request)
    }

    /// Record a successful generation
    ///
    /// # Errors
    ///
    /// [`TryOnError::InvalidTransition`] unless generating.
    pub fn complete_generation(&mut self, result: TryOnResult) -> Result<(), TryOnError> {
        if !self.is_generating() {
            return Err(self.reject("complete a generation"));
        }
        self.result = Some(result);
        self.stage = WorkflowStage::ResultReady;
        Ok(())
    }

    /// Return to `CapturePhoto` after a failed generation, keeping outfit and photo
    ///
    /// # Errors
    ///
    /// [`TryOnError::InvalidTransition`] unless generating.
    pub fn fail_generation(&mut self) -> Result<(), TryOnError> {
        if !self.is_generating() {
            return Err(self.reject("fail a generation"));
        }
        self.stage = WorkflowStage::CapturePhoto;
        Ok(())
    }

    /// Step back one stage, discarding what was acquired after it
    ///
    /// Returns the stage now active. Going back from `SelectOutfit` is a no-op.
    ///
    /// # Errors
    ///
    /// [`TryOnError::InvalidTransition`] while generating.
    pub fn back(&mut self) -> Result<WorkflowStage, TryOnError> {
        match self.stage {
            WorkflowStage::SelectOutfit => {}
            WorkflowStage::CapturePhoto => {
                self.selected_outfit = None;
                self.captured_image = None;
                self.stage = WorkflowStage::SelectOutfit;
            }
            WorkflowStage::Generating => return Err(self.reject("go back")),
            WorkflowStage::ResultReady => {
                self.result = None;
                self.captured_image = None;
                self.stage = WorkflowStage::CapturePhoto;
            }
        }
        Ok(self.stage)
    }

    /// Clear everything and return to `SelectOutfit`; the session ID is kept
    ///
    /// # Errors
    ///
    /// [`TryOnError::InvalidTransition`] while generating.
    pub fn reset(&mut self) -> Result<(), TryOnError> {
        if self.is_generating() {
            return Err(self.reject("reset"));
        }
        *self = Self::with_id(self.id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{fixtures, ImageCapture, RawFile};
    use crate::catalog::{ImageReference, OutfitId, OutfitReference};
    use pretty_assertions::assert_eq;

    fn outfit(number: u32) -> OutfitItem {
        OutfitItem {
            id: OutfitId(format!("outfit-{number}")),
            name: format!("Outfit {number}"),
            image: ImageReference::Url(format!("/outfits/{number}.png")),
            number: Some(number),
        }
    }

    fn photo() -> CapturedImage {
        ImageCapture::default()
            .capture(vec![RawFile::new("dog.png", None, fixtures::png_bytes())])
            .unwrap()
            .image
    }

    fn result(id: &str) -> TryOnResult {
        TryOnResult::new(TryOnId(id.to_string()), "iVBORw0KGgo=".to_string(), None).unwrap()
    }

    fn ready_session() -> TryOnSession {
        let mut session = TryOnSession::new();
        session.select_outfit(outfit(3)).unwrap();
        session.attach_image(photo()).unwrap();
        session
    }

    #[test]
    fn test_initial_state() {
        let session = TryOnSession::new();
        assert_eq!(session.stage(), WorkflowStage::SelectOutfit);
        assert!(session.selected_outfit().is_none());
        assert!(session.captured_image().is_none());
        assert!(session.result().is_none());
    }

    #[test]
    fn test_happy_path() {
        let mut session = ready_session();
        session.set_customer_name(Some("  Luna "), 80).unwrap();

        let request = session.begin_generation().unwrap();
        assert_eq!(session.stage(), WorkflowStage::Generating);
        assert_eq!(request.outfit, OutfitReference::Number(3));
        assert_eq!(request.customer_name.as_deref(), Some("Luna"));
        assert_eq!(request.image_base64, photo().encoded);

        session.complete_generation(result("abc")).unwrap();
        assert_eq!(session.stage(), WorkflowStage::ResultReady);
        assert_eq!(session.result().unwrap().id, TryOnId("abc".to_string()));
    }

    #[test]
    fn test_generation_requires_outfit_and_photo() {
        let mut session = TryOnSession::new();
        let err = session.begin_generation().unwrap_err();
        assert!(err.is_programmer_error());

        session.select_outfit(outfit(1)).unwrap();
        let err = session.begin_generation().unwrap_err();
        assert!(err.is_programmer_error());
        assert_eq!(session.stage(), WorkflowStage::CapturePhoto);
    }

    #[test]
    fn test_reentrant_generation_rejected() {
        let mut session = ready_session();
        session.begin_generation().unwrap();
        assert!(matches!(
            session.begin_generation(),
            Err(TryOnError::GenerationInFlight)
        ));
        assert_eq!(session.stage(), WorkflowStage::Generating);
    }

    #[test]
    fn test_failure_preserves_outfit_and_photo() {
        let mut session = ready_session();
        session.begin_generation().unwrap();
        session.fail_generation().unwrap();

        assert_eq!(session.stage(), WorkflowStage::CapturePhoto);
        assert_eq!(session.selected_outfit(), Some(&outfit(3)));
        assert_eq!(session.captured_image(), Some(&photo()));

        // Retry works straight away
        assert!(session.begin_generation().is_ok());
    }

    #[test]
    fn test_back_and_reset_blocked_while_generating() {
        let mut session = ready_session();
        session.begin_generation().unwrap();

        assert!(session.back().is_err());
        assert!(session.reset().is_err());
        assert!(session.set_customer_name(Some("x"), 80).is_err());
        assert_eq!(session.stage(), WorkflowStage::Generating);
    }

    #[test]
    fn test_back_discards_later_data() {
        let mut session = ready_session();
        session.begin_generation().unwrap();
        session.complete_generation(result("abc")).unwrap();

        assert_eq!(session.back().unwrap(), WorkflowStage::CapturePhoto);
        assert!(session.result().is_none());
        assert!(session.captured_image().is_none());
        assert!(session.selected_outfit().is_some());

        assert_eq!(session.back().unwrap(), WorkflowStage::SelectOutfit);
        assert!(session.selected_outfit().is_none());

        assert_eq!(session.back().unwrap(), WorkflowStage::SelectOutfit);
    }

    #[test]
    fn test_reset_clears_everything_but_id() {
        let mut session = ready_session();
        session.set_customer_name(Some("Luna"), 80).unwrap();
        session.begin_generation().unwrap();
        session.complete_generation(result("abc")).unwrap();
        let id = session.id().clone();

        session.reset().unwrap();
        assert_eq!(session.id(), &id);
        assert_eq!(session.stage(), WorkflowStage::SelectOutfit);
        assert!(session.selected_outfit().is_none());
        assert!(session.captured_image().is_none());
        assert!(session.customer_name().is_none());
        assert!(session.result().is_none());
    }

    #[test]
    fn test_customer_name_validation() {
        let mut session = TryOnSession::new();
        session.set_customer_name(Some("   "), 5).unwrap();
        assert_eq!(session.customer_name(), None);

        assert!(matches!(
            session.set_customer_name(Some("Maximilian"), 5),
            Err(TryOnError::InvalidInput(_))
        ));
        assert_eq!(session.customer_name(), None);
    }

    #[test]
    fn test_attach_outside_capture_rejected() {
        let mut session = TryOnSession::new();
        assert!(session.attach_image(photo()).is_err());
        assert!(session.captured_image().is_none());
    }

    #[test]
    fn test_result_validation() {
        assert!(matches!(
            TryOnResult::new(TryOnId("a".to_string()), "!!!".to_string(), None),
            Err(TryOnError::Generation(_))
        ));
        assert!(matches!(
            TryOnResult::new(TryOnId("a".to_string()), String::new(), None),
            Err(TryOnError::Generation(_))
        ));

        let ok = result("abc");
        assert_eq!(ok.media_type, "image/png");
        assert_eq!(ok.preview(), "data:image/png;base64,iVBORw0KGgo=");
    }
}
