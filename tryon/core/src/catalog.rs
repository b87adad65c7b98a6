//! Outfit Catalog
//!
//! Supplies the selectable outfits. Two sources exist:
//!
//! - [`RemoteCatalog`] lists outfits from the backend (`GET /api/outfits`);
//!   items are referenced by backend id.
//! - [`StaticCatalog`] enumerates image files in a local directory, sorted by
//!   name and numbered from 1; items are referenced by that number.
//!
//! [`CatalogState`] keeps "loaded but empty" apart from "load failed" so a
//! surface can render the two differently.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::{RemoteOutfit, TryOnBackend};
use crate::capture::{self, MediaType};
use crate::error::TryOnError;

/// Backend identifier of an outfit
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutfitId(pub String);

impl std::fmt::Display for OutfitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an outfit's picture comes from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageReference {
    /// Remote URL
    Url(String),
    /// Base64 image carried inline
    Inline {
        /// MIME type of the payload
        media_type: String,
        /// Standard base64
        base64: String,
    },
    /// Local file
    Path(PathBuf),
}

impl ImageReference {
    /// Something a surface can put in an `<img src>` or print
    #[must_use]
    pub fn display_ref(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Inline { media_type, base64 } => capture::data_url(media_type, base64),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

/// How the backend should resolve the chosen outfit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutfitReference {
    /// Sent as `outfit_id`
    Id(OutfitId),
    /// Sent as `outfit_number`
    Number(u32),
}

impl std::fmt::Display for OutfitReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Number(n) => write!(f, "#{n}"),
        }
    }
}

/// A selectable outfit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutfitItem {
    /// Unique within a loaded catalog
    pub id: OutfitId,
    /// Display name
    pub name: String,
    /// Picture of the outfit
    pub image: ImageReference,
    /// Stable 1-based position, when the source numbers its items
    pub number: Option<u32>,
}

impl OutfitItem {
    /// How to reference this item in a generation request
    #[must_use]
    pub fn reference(&self) -> OutfitReference {
        match self.number {
            Some(n) => OutfitReference::Number(n),
            None => OutfitReference::Id(self.id.clone()),
        }
    }

    fn from_remote(outfit: RemoteOutfit) -> Self {
        let media_type = sniff_base64_mime(&outfit.image_base64);
        Self {
            id: outfit.id,
            name: outfit.name,
            image: ImageReference::Inline {
                media_type: media_type.to_string(),
                base64: outfit.image_base64,
            },
            number: None,
        }
    }
}

/// Sniff the type of a base64 image from its first few bytes only
fn sniff_base64_mime(encoded: &str) -> &'static str {
    let prefix: String = encoded.chars().take(64).collect();
    capture::decode_base64(&prefix).map_or("image/png", |bytes| capture::sniff_mime(&bytes))
}

/// User-facing way of picking an outfit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutfitSelector {
    /// By backend id
    ById(OutfitId),
    /// By displayed 1-based number
    ByNumber(u32),
}

impl std::fmt::Display for OutfitSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ById(id) => write!(f, "{id}"),
            Self::ByNumber(n) => write!(f, "#{n}"),
        }
    }
}

// =============================================================================
// Catalog State
// =============================================================================

/// What the surface should show for the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CatalogState {
    /// No load attempted yet
    #[default]
    NotLoaded,
    /// At least one outfit is available
    Loaded(Vec<OutfitItem>),
    /// The source answered with zero outfits
    Empty,
    /// The source could not be read
    Failed(String),
}

impl CatalogState {
    /// Build a state from loaded items, dropping duplicate ids
    #[must_use]
    pub fn from_items(items: Vec<OutfitItem>) -> Self {
        if items.is_empty() {
            return Self::Empty;
        }

        let mut seen = HashSet::new();
        let total = items.len();
        let unique: Vec<OutfitItem> = items
            .into_iter()
            .filter(|item| seen.insert(item.id.clone()))
            .collect();

        if unique.len() != total {
            tracing::warn!(
                dropped = total - unique.len(),
                "Catalog contained duplicate outfit ids"
            );
        }

        Self::Loaded(unique)
    }

    /// Build a state from the outcome of a load
    #[must_use]
    pub fn from_result(result: Result<Vec<OutfitItem>, TryOnError>) -> Self {
        match result {
            Ok(items) => Self::from_items(items),
            Err(TryOnError::EmptyCatalog) => Self::Empty,
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    /// The loaded items
    ///
    /// # Errors
    ///
    /// [`TryOnError::EmptyCatalog`] for an empty catalog, otherwise
    /// [`TryOnError::CatalogUnavailable`].
    pub fn items(&self) -> Result<&[OutfitItem], TryOnError> {
        match self {
            Self::Loaded(items) => Ok(items),
            Self::Empty => Err(TryOnError::EmptyCatalog),
            Self::Failed(reason) => Err(TryOnError::CatalogUnavailable(reason.clone())),
            Self::NotLoaded => Err(TryOnError::CatalogUnavailable(
                "catalog has not been loaded".to_string(),
            )),
        }
    }

    /// Find the outfit a selector points at
    ///
    /// Numbers match an item's own number; for unnumbered catalogs they fall
    /// back to the 1-based display position.
    ///
    /// # Errors
    ///
    /// [`TryOnError::UnknownOutfit`] if nothing matches, or the errors of
    /// [`CatalogState::items`].
    pub fn resolve(&self, selector: &OutfitSelector) -> Result<&OutfitItem, TryOnError> {
        let items = self.items()?;
        let found = match selector {
            OutfitSelector::ById(id) => items.iter().find(|item| &item.id == id),
            OutfitSelector::ByNumber(n) => items
                .iter()
                .find(|item| item.number == Some(*n))
                .or_else(|| {
                    let index = usize::try_from(*n).ok()?.checked_sub(1)?;
                    items.get(index).filter(|item| item.number.is_none())
                }),
        };
        found.ok_or_else(|| TryOnError::UnknownOutfit(selector.to_string()))
    }

    /// Number of available outfits
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Loaded(items) => items.len(),
            _ => 0,
        }
    }

    /// Whether no outfits are available
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Sources
// =============================================================================

/// Something that can produce the outfit list
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Load every outfit; an empty list is a valid answer
    async fn load_catalog(&self) -> Result<Vec<OutfitItem>, TryOnError>;
}

#[async_trait]
impl CatalogSource for Box<dyn CatalogSource> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn load_catalog(&self) -> Result<Vec<OutfitItem>, TryOnError> {
        (**self).load_catalog().await
    }
}

/// Catalog listed by the backend
pub struct RemoteCatalog<B: TryOnBackend> {
    backend: Arc<B>,
}

impl<B: TryOnBackend> RemoteCatalog<B> {
    /// Create a catalog backed by `backend`
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: TryOnBackend> CatalogSource for RemoteCatalog<B> {
    fn describe(&self) -> String {
        format!("remote ({})", self.backend.name())
    }

    async fn load_catalog(&self) -> Result<Vec<OutfitItem>, TryOnError> {
        let outfits = self
            .backend
            .list_outfits()
            .await
            .map_err(TryOnError::from_catalog)?;

        let mut items = Vec::with_capacity(outfits.len());
        for mut outfit in outfits {
            if outfit.image_base64.is_empty() {
                tracing::debug!(outfit = %outfit.id, "Listing has no image, fetching it");
                outfit.image_base64 = self
                    .backend
                    .outfit_image(&outfit.id)
                    .await
                    .map_err(TryOnError::from_catalog)?;
            }
            items.push(OutfitItem::from_remote(outfit));
        }
        Ok(items)
    }
}

/// Catalog enumerated from image files in a directory
#[derive(Clone, Debug)]
pub struct StaticCatalog {
    dir: PathBuf,
}

impl StaticCatalog {
    /// Create a catalog over `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory being enumerated
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    fn describe(&self) -> String {
        format!("static ({})", self.dir.display())
    }

    async fn load_catalog(&self) -> Result<Vec<OutfitItem>, TryOnError> {
        let unavailable =
            |e: std::io::Error| TryOnError::CatalogUnavailable(format!("{}: {e}", self.dir.display()));

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(unavailable)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            let path = entry.path();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file && MediaType::from_path(&path).is_some() {
                paths.push(path);
            }
        }
        paths.sort();

        let items = paths
            .into_iter()
            .zip(1u32..)
            .map(|(path, number)| {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let file_name = path
                    .file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                OutfitItem {
                    id: OutfitId(file_name),
                    name: stem,
                    image: ImageReference::Path(path),
                    number: Some(number),
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(dir = %self.dir.display(), count = items.len(), "Enumerated static catalog");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GatewayError;
    use pretty_assertions::assert_eq;

    fn item(id: &str, number: Option<u32>) -> OutfitItem {
        OutfitItem {
            id: OutfitId(id.to_string()),
            name: id.to_uppercase(),
            image: ImageReference::Url(format!("https://example.com/{id}.png")),
            number,
        }
    }

    #[test]
    fn test_empty_is_not_failed() {
        assert_eq!(CatalogState::from_items(Vec::new()), CatalogState::Empty);
        assert!(matches!(
            CatalogState::Empty.items(),
            Err(TryOnError::EmptyCatalog)
        ));

        let failed = CatalogState::from_result(Err(TryOnError::Network("refused".to_string())));
        assert!(matches!(failed, CatalogState::Failed(_)));
        assert!(matches!(
            failed.items(),
            Err(TryOnError::CatalogUnavailable(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_are_dropped() {
        let state = CatalogState::from_items(vec![item("a", None), item("b", None), item("a", None)]);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_resolve_by_number_and_id() {
        let numbered = CatalogState::from_items(vec![
            item("one", Some(1)),
            item("two", Some(2)),
            item("three", Some(3)),
        ]);
        let three = numbered.resolve(&OutfitSelector::ByNumber(3)).unwrap();
        assert_eq!(three.id.0, "three");
        assert_eq!(three.reference(), OutfitReference::Number(3));

        let remote = CatalogState::from_items(vec![item("x", None), item("y", None)]);
        let second = remote.resolve(&OutfitSelector::ByNumber(2)).unwrap();
        assert_eq!(second.reference(), OutfitReference::Id(OutfitId("y".to_string())));

        assert!(matches!(
            remote.resolve(&OutfitSelector::ByNumber(0)),
            Err(TryOnError::UnknownOutfit(_))
        ));
        assert!(matches!(
            remote.resolve(&OutfitSelector::ById(OutfitId("z".to_string()))),
            Err(TryOnError::UnknownOutfit(_))
        ));
    }

    #[test]
    fn test_remote_item_sniffs_inline_type() {
        use base64::{engine::general_purpose, Engine as _};

        let encoded = general_purpose::STANDARD.encode(capture::fixtures::jpeg_bytes());
        let outfit = OutfitItem::from_remote(RemoteOutfit {
            id: OutfitId("o1".to_string()),
            name: "Raincoat".to_string(),
            image_base64: encoded.clone(),
        });
        assert_eq!(outfit.number, None);
        assert_eq!(
            outfit.image.display_ref(),
            format!("data:image/jpeg;base64,{encoded}")
        );
    }

    /// Lists two outfits, only the first with its image inline
    struct ListingBackend {
        fetched: std::sync::Mutex<Vec<OutfitId>>,
    }

    #[async_trait]
    impl TryOnBackend for ListingBackend {
        fn name(&self) -> &str {
            "listing"
        }

        async fn health_check(&self) -> bool {
            true
        }

        async fn list_outfits(&self) -> Result<Vec<RemoteOutfit>, GatewayError> {
            Ok(vec![
                RemoteOutfit {
                    id: OutfitId("inline".to_string()),
                    name: "Raincoat".to_string(),
                    image_base64: "iVBORw0KGgo=".to_string(),
                },
                RemoteOutfit {
                    id: OutfitId("bare".to_string()),
                    name: "Hoodie".to_string(),
                    image_base64: String::new(),
                },
            ])
        }

        async fn outfit_image(&self, id: &OutfitId) -> Result<String, GatewayError> {
            self.fetched.lock().unwrap().push(id.clone());
            Ok("/9j/4AAQSkZJRg==".to_string())
        }

        async fn generate(
            &self,
            _request: &crate::backend::GenerationRequest,
        ) -> Result<crate::backend::GenerationResult, GatewayError> {
            Err(GatewayError::InvalidRequest("not used".to_string()))
        }

        async fn result_image(&self, _id: &crate::messages::TryOnId) -> Result<String, GatewayError> {
            Err(GatewayError::InvalidRequest("not used".to_string()))
        }

        async fn share_link(
            &self,
            _id: &crate::messages::TryOnId,
        ) -> Result<crate::backend::ShareLink, GatewayError> {
            Err(GatewayError::InvalidRequest("not used".to_string()))
        }
    }

    #[tokio::test]
    async fn test_remote_catalog_fetches_missing_images() {
        let backend = Arc::new(ListingBackend {
            fetched: std::sync::Mutex::new(Vec::new()),
        });
        let items = RemoteCatalog::new(Arc::clone(&backend))
            .load_catalog()
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(
            *backend.fetched.lock().unwrap(),
            vec![OutfitId("bare".to_string())]
        );
        assert_eq!(
            items[1].image,
            ImageReference::Inline {
                media_type: "image/jpeg".to_string(),
                base64: "/9j/4AAQSkZJRg==".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_static_catalog_sorted_and_numbered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b-hoodie.jpg", "a-raincoat.png", "notes.txt", "c-bowtie.webp"] {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }
        tokio::fs::create_dir(dir.path().join("nested.png")).await.unwrap();

        let items = StaticCatalog::new(dir.path()).load_catalog().await.unwrap();
        let summary: Vec<(Option<u32>, &str)> =
            items.iter().map(|i| (i.number, i.name.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (Some(1), "a-raincoat"),
                (Some(2), "b-hoodie"),
                (Some(3), "c-bowtie"),
            ]
        );
    }

    #[tokio::test]
    async fn test_static_catalog_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = StaticCatalog::new(dir.path().join("missing"))
            .load_catalog()
            .await
            .unwrap_err();
        assert!(matches!(err, TryOnError::CatalogUnavailable(_)));
    }
}
