//! HTTP Backend Implementation
//!
//! Gateway to the try-on REST service. All endpoints hang off a configurable
//! base URL under `/api`.
//!
//! No client-side timeout is enforced unless one is configured; otherwise the
//! request relies on reqwest's transport defaults. Generation can take up to a
//! minute.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{
    AdminBackend, AdminCredentials, GatewayError, GenerationRequest, GenerationResult,
    RemoteOutfit, ShareLink, TryOnBackend, TryOnRecord, UploadSummary,
};
use crate::catalog::{OutfitId, OutfitReference};
use crate::config::BackendSettings;
use crate::messages::TryOnId;

/// HTTP client for the try-on service
#[derive(Clone)]
pub struct HttpBackend {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for `base_url`, with an optional request timeout
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| GatewayError::InvalidRequest(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Create from loaded configuration
    ///
    /// # Errors
    ///
    /// See [`HttpBackend::new`].
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, GatewayError> {
        Self::new(settings.base_url.clone(), settings.request_timeout)
    }

    /// The configured base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    /// API URL for a path built from segments, each one percent-encoded
    ///
    /// Ids come from the backend and from the command line; reserved
    /// characters inside one stay part of that segment.
    fn resource_url(&self, segments: &[&str]) -> Result<reqwest::Url, GatewayError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(GatewayError::InvalidRequest(format!(
                "invalid path segment '{bad}'"
            )));
        }

        let mut url = reqwest::Url::parse(&self.api_url("")).map_err(|e| {
            GatewayError::InvalidRequest(format!("invalid base URL {}: {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::InvalidRequest(format!("base URL {} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn transport_error(endpoint: &str, error: &reqwest::Error) -> GatewayError {
        GatewayError::Transport {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
            timeout: error.is_timeout(),
        }
    }

    /// Send a request and turn non-success statuses into errors
    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(endpoint, error = %e, "Backend unreachable");
            Self::transport_error(endpoint, &e)
        })?;

        let status = response.status();
        tracing::debug!(endpoint, status = status.as_u16(), "Backend responded");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            detail: extract_detail(&body),
        })
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(endpoint, &e))?;
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Malformed {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, GatewayError> {
        self.get_json_at(endpoint, self.api_url(endpoint)).await
    }

    async fn get_json_at<T: DeserializeOwned, U: reqwest::IntoUrl + Send>(
        &self,
        endpoint: &str,
        url: U,
    ) -> Result<T, GatewayError> {
        let response = self.send(endpoint, self.http_client.get(url)).await?;
        Self::read_json(endpoint, response).await
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Pull FastAPI-style `{"detail": ...}` out of an error body
fn extract_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: serde_json::Value,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "no details".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Treat absent and empty strings the same
fn required(
    endpoint: &str,
    field: &'static str,
    value: Option<String>,
) -> Result<String, GatewayError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| GatewayError::MissingField {
            endpoint: endpoint.to_string(),
            field,
        })
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Serialize)]
struct TryOnBody<'a> {
    dog_image_base64: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    outfit_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outfit_number: Option<u32>,
    customer_name: Option<&'a str>,
}

impl<'a> TryOnBody<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        let (outfit_id, outfit_number) = match &request.outfit {
            OutfitReference::Id(id) => (Some(id.0.as_str()), None),
            OutfitReference::Number(n) => (None, Some(*n)),
        };
        Self {
            dog_image_base64: &request.image_base64,
            outfit_id,
            outfit_number,
            customer_name: request.customer_name.as_deref(),
        }
    }
}

#[derive(Deserialize)]
struct TryOnResponse {
    id: Option<String>,
    result_image_base64: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ImageResponse {
    image_base64: Option<String>,
}

#[derive(Deserialize)]
struct ShareResponse {
    whatsapp_url: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    authenticated: bool,
}

// =============================================================================
// Trait Implementations
// =============================================================================

#[async_trait]
impl TryOnBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.api_url("/"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn list_outfits(&self) -> Result<Vec<RemoteOutfit>, GatewayError> {
        let outfits: Vec<RemoteOutfit> = self.get_json("/outfits").await?;
        tracing::info!(count = outfits.len(), "Fetched outfit catalog");
        Ok(outfits)
    }

    async fn outfit_image(&self, id: &OutfitId) -> Result<String, GatewayError> {
        let endpoint = format!("/outfits/{}/base64", id.0);
        let url = self.resource_url(&["outfits", id.0.as_str(), "base64"])?;
        let body: ImageResponse = self.get_json_at(&endpoint, url).await?;
        required(&endpoint, "image_base64", body.image_base64)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GatewayError> {
        let endpoint = "/tryon";
        tracing::info!(
            outfit = ?request.outfit,
            photo_bytes = request.image_base64.len(),
            "Requesting try-on generation"
        );

        let response = self
            .send(
                endpoint,
                self.http_client
                    .post(self.api_url(endpoint))
                    .json(&TryOnBody::from_request(request)),
            )
            .await?;
        let body: TryOnResponse = Self::read_json(endpoint, response).await?;

        let result_image_base64 = required(endpoint, "result_image_base64", body.result_image_base64)?;
        let id = required(endpoint, "id", body.id)?;

        Ok(GenerationResult {
            id: TryOnId(id),
            result_image_base64,
            message: body.message,
        })
    }

    async fn result_image(&self, id: &TryOnId) -> Result<String, GatewayError> {
        let endpoint = format!("/tryon/{}/base64", id.0);
        let url = self.resource_url(&["tryon", id.0.as_str(), "base64"])?;
        let body: ImageResponse = self.get_json_at(&endpoint, url).await?;
        required(&endpoint, "image_base64", body.image_base64)
    }

    async fn share_link(&self, id: &TryOnId) -> Result<ShareLink, GatewayError> {
        let endpoint = format!("/tryon/{}/whatsapp", id.0);
        let url = self.resource_url(&["tryon", id.0.as_str(), "whatsapp"])?;
        let response = self.send(&endpoint, self.http_client.post(url)).await?;
        let body: ShareResponse = Self::read_json(&endpoint, response).await?;

        Ok(ShareLink {
            url: required(&endpoint, "whatsapp_url", body.whatsapp_url)?,
            message: body.message,
        })
    }
}

#[async_trait]
impl AdminBackend for HttpBackend {
    async fn login(&self, credentials: &AdminCredentials) -> Result<bool, GatewayError> {
        let endpoint = "/admin-login";
        let request = self.http_client.post(self.api_url(endpoint)).json(credentials);

        match self.send(endpoint, request).await {
            Ok(response) => {
                let body: LoginResponse = Self::read_json(endpoint, response).await?;
                Ok(body.authenticated)
            }
            Err(GatewayError::Status {
                status: 401 | 403, ..
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn upload_catalog(
        &self,
        file_name: &str,
        pdf: Vec<u8>,
    ) -> Result<UploadSummary, GatewayError> {
        let endpoint = "/upload-catalog";
        let part = reqwest::multipart::Part::bytes(pdf)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .send(
                endpoint,
                self.http_client.post(self.api_url(endpoint)).multipart(form),
            )
            .await?;
        Self::read_json(endpoint, response).await
    }

    async fn upload_outfit_image(
        &self,
        name: &str,
        file_name: &str,
        mime: &str,
        image: Vec<u8>,
    ) -> Result<UploadSummary, GatewayError> {
        let endpoint = "/upload-outfit-image";
        let part = reqwest::multipart::Part::bytes(image)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("name", name.trim().to_string())
            .part("file", part);

        let response = self
            .send(
                endpoint,
                self.http_client.post(self.api_url(endpoint)).multipart(form),
            )
            .await?;
        Self::read_json(endpoint, response).await
    }

    async fn clear_catalog(&self) -> Result<(), GatewayError> {
        let endpoint = "/outfits";
        self.send(endpoint, self.http_client.delete(self.api_url(endpoint)))
            .await?;
        tracing::info!("Catalog cleared");
        Ok(())
    }

    async fn list_results(&self) -> Result<Vec<TryOnRecord>, GatewayError> {
        self.get_json("/results").await
    }
}
