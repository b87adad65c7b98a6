//! Backend Gateway Traits
//!
//! Trait definitions for the remote try-on service. The controller only ever
//! talks to a [`TryOnBackend`]; the HTTP implementation lives in
//! [`super::http`] and tests plug in scripted doubles.
//!
//! # Design Philosophy
//!
//! The gateway is a thin request/response boundary. It validates the shape of
//! what comes back (a response without `result_image_base64` is an error, not an
//! empty success) but makes no workflow decisions. Classification into
//! user-facing errors happens in the controller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{OutfitId, OutfitReference};
use crate::messages::TryOnId;

/// Failures at the gateway boundary
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The request never got an HTTP answer
    #[error("{endpoint}: {message}")]
    Transport {
        /// Endpoint that was called
        endpoint: String,
        /// Transport error description
        message: String,
        /// Whether the failure was a timeout
        timeout: bool,
    },

    /// The backend answered with a non-success status
    #[error("{endpoint} returned {status}: {detail}")]
    Status {
        /// Endpoint that was called
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Server-provided `detail`, or the raw body
        detail: String,
    },

    /// A success response lacked a required field
    #[error("{endpoint} response is missing `{field}`")]
    MissingField {
        /// Endpoint that was called
        endpoint: String,
        /// Name of the absent field
        field: &'static str,
    },

    /// A success response could not be parsed
    #[error("{endpoint} returned a malformed response: {message}")]
    Malformed {
        /// Endpoint that was called
        endpoint: String,
        /// Parse error description
        message: String,
    },

    /// The request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// HTTP status, if the backend answered
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// An outfit as listed by `GET /api/outfits`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOutfit {
    /// Backend identifier
    pub id: OutfitId,
    /// Display name
    pub name: String,
    /// Outfit image, base64; empty when the listing leaves images out
    #[serde(default)]
    pub image_base64: String,
}

/// What to generate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Base64 of the pet photo
    pub image_base64: String,
    /// Which outfit to apply
    pub outfit: OutfitReference,
    /// Optional customer name
    pub customer_name: Option<String>,
}

/// A successful generation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationResult {
    /// Backend identifier of the stored result
    pub id: TryOnId,
    /// Generated image, base64
    pub result_image_base64: String,
    /// Optional backend message
    pub message: Option<String>,
}

/// A share link for a result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    /// Link to open
    pub url: String,
    /// Prefilled message text
    pub message: Option<String>,
}

/// Admin login credentials
#[derive(Clone, Serialize)]
pub struct AdminCredentials {
    /// Admin user name
    pub username: String,
    /// Admin password
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response to a catalog or outfit upload
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UploadSummary {
    /// Backend message
    pub message: String,
    /// Number of outfits created
    #[serde(default)]
    pub outfits: Option<u32>,
}

/// A stored try-on as listed by `GET /api/results`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TryOnRecord {
    /// Result identifier
    pub id: TryOnId,
    /// Outfit that was applied
    pub outfit_id: OutfitId,
    /// Customer name, if one was given
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Whether a share link was generated
    #[serde(default)]
    pub whatsapp_shared: bool,
    /// Creation timestamp as sent by the backend
    #[serde(default)]
    pub created_at: Option<String>,
}

/// The try-on service, as seen by the workflow
#[async_trait]
pub trait TryOnBackend: Send + Sync {
    /// Backend name for logs and session info
    fn name(&self) -> &str;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// List the catalog; an empty list is valid
    async fn list_outfits(&self) -> Result<Vec<RemoteOutfit>, GatewayError>;

    /// Fetch a single outfit image (base64)
    async fn outfit_image(&self, id: &OutfitId) -> Result<String, GatewayError>;

    /// Generate a try-on image
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResult, GatewayError>;

    /// Fetch a stored result image (base64)
    async fn result_image(&self, id: &TryOnId) -> Result<String, GatewayError>;

    /// Build a share link for a stored result
    async fn share_link(&self, id: &TryOnId) -> Result<ShareLink, GatewayError>;
}

/// Catalog maintenance endpoints; not part of the customer workflow
#[async_trait]
pub trait AdminBackend: Send + Sync {
    /// Check credentials; `Ok(false)` means rejected
    async fn login(&self, credentials: &AdminCredentials) -> Result<bool, GatewayError>;

    /// Upload a PDF catalog; each page becomes an outfit
    async fn upload_catalog(
        &self,
        file_name: &str,
        pdf: Vec<u8>,
    ) -> Result<UploadSummary, GatewayError>;

    /// Upload a single outfit image under a display name
    async fn upload_outfit_image(
        &self,
        name: &str,
        file_name: &str,
        mime: &str,
        image: Vec<u8>,
    ) -> Result<UploadSummary, GatewayError>;

    /// Remove every outfit
    async fn clear_catalog(&self) -> Result<(), GatewayError>;

    /// List stored try-on results, newest first
    async fn list_results(&self) -> Result<Vec<TryOnRecord>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_outfit_ignores_extra_fields() {
        let json = r#"{"id":"o1","name":"Raincoat","image_base64":"AAAA","created_at":"2024-01-01T00:00:00"}"#;
        let outfit: RemoteOutfit = serde_json::from_str(json).unwrap();
        assert_eq!(outfit.id, OutfitId("o1".to_string()));
        assert_eq!(outfit.name, "Raincoat");

        let bare: RemoteOutfit = serde_json::from_str(r#"{"id":"o2","name":"Hoodie"}"#).unwrap();
        assert!(bare.image_base64.is_empty());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = AdminCredentials {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_gateway_error_status() {
        let err = GatewayError::Status {
            endpoint: "/api/tryon".to_string(),
            status: 500,
            detail: "boom".to_string(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "/api/tryon returned 500: boom");
    }
}
