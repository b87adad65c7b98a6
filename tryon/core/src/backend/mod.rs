//! Backend Gateway
//!
//! Access to the remote try-on service through a common trait interface.
//!
//! # Endpoints
//!
//! - `GET /api/outfits` - catalog listing
//! - `POST /api/tryon` - generate a try-on image
//! - `POST /api/tryon/{id}/whatsapp` - share link
//! - `POST /api/admin-login`, `POST /api/upload-catalog`,
//!   `POST /api/upload-outfit-image`, `DELETE /api/outfits` - admin only
//!
//! # Usage
//!
//! ```ignore
//! use tryon_core::backend::{HttpBackend, TryOnBackend};
//!
//! let backend = HttpBackend::new("http://localhost:8001", None)?;
//! let outfits = backend.list_outfits().await?;
//! ```

mod http;
mod traits;

pub use http::HttpBackend;
pub use traits::{
    AdminBackend, AdminCredentials, GatewayError, GenerationRequest, GenerationResult,
    RemoteOutfit, ShareLink, TryOnBackend, TryOnRecord, UploadSummary,
};
