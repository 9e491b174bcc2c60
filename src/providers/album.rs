//! System photo album, reached through the host's photo-library API.
//!
//! The host library is an external collaborator: this module only maps its
//! permission states and assets onto the common provider contract.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::traits::{require_session, AuthorizeResult, MediaProvider, ProviderError};
use crate::media::{AssetMediaType, Coordinate, MediaAsset, MediaQuery, SourceKind};
use crate::runtime::CancellationToken;
use crate::sessions::Session;

/// Permission states reported by the host photo library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryAuthorization {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
}

/// One item in the host library.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryAsset {
    pub local_identifier: String,
    pub media_type: AssetMediaType,
    pub duration: f64,
    pub coordinate: Option<Coordinate>,
}

impl From<LibraryAsset> for MediaAsset {
    fn from(asset: LibraryAsset) -> Self {
        MediaAsset {
            identifier: asset.local_identifier,
            media_type: asset.media_type,
            source: SourceKind::SystemAlbum,
            source_url: None,
            thumbnail_url: None,
            duration: asset.duration,
            coordinate: asset.coordinate,
        }
    }
}

/// Host photo-library API.
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// Ask the user for access, or report the standing decision.
    async fn request_authorization(&self) -> LibraryAuthorization;

    /// Assets of `media_type`, in library order.
    async fn fetch_assets(
        &self,
        media_type: AssetMediaType,
    ) -> Result<Vec<LibraryAsset>, ProviderError>;

    /// A file a player can open for the given video, if the library can
    /// export one.
    async fn playable_path(&self, local_identifier: &str)
        -> Result<Option<PathBuf>, ProviderError>;

    fn name(&self) -> &str;
}

/// Library held in memory. Stands in for the host library on platforms
/// without one.
pub struct InMemoryPhotoLibrary {
    authorization: Mutex<LibraryAuthorization>,
    assets: Mutex<Vec<LibraryAsset>>,
    files: Mutex<HashMap<String, PathBuf>>,
}

impl InMemoryPhotoLibrary {
    pub fn new(authorization: LibraryAuthorization) -> Self {
        Self {
            authorization: Mutex::new(authorization),
            assets: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_authorization(&self, authorization: LibraryAuthorization) {
        *self.authorization.lock() = authorization;
    }

    pub fn add(&self, asset: LibraryAsset) {
        self.assets.lock().push(asset);
    }

    /// Register the exported file for a video asset.
    pub fn add_file(&self, local_identifier: &str, path: PathBuf) {
        self.files.lock().insert(local_identifier.to_string(), path);
    }
}

#[async_trait]
impl PhotoLibrary for InMemoryPhotoLibrary {
    async fn request_authorization(&self) -> LibraryAuthorization {
        *self.authorization.lock()
    }

    async fn fetch_assets(
        &self,
        media_type: AssetMediaType,
    ) -> Result<Vec<LibraryAsset>, ProviderError> {
        Ok(self
            .assets
            .lock()
            .iter()
            .filter(|a| a.media_type == media_type)
            .cloned()
            .collect())
    }

    async fn playable_path(
        &self,
        local_identifier: &str,
    ) -> Result<Option<PathBuf>, ProviderError> {
        Ok(self.files.lock().get(local_identifier).cloned())
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

/// The device camera roll.
pub struct SystemAlbumProvider {
    library: Arc<dyn PhotoLibrary>,
}

impl SystemAlbumProvider {
    pub fn new(library: Arc<dyn PhotoLibrary>) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &Arc<dyn PhotoLibrary> {
        &self.library
    }
}

#[async_trait]
impl MediaProvider for SystemAlbumProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::SystemAlbum
    }

    async fn authorize(&self, cancel: &CancellationToken) -> AuthorizeResult {
        let Some(status) = cancel
            .run_until_cancelled(self.library.request_authorization())
            .await
        else {
            return AuthorizeResult::Cancelled;
        };
        tracing::debug!(library = self.library.name(), ?status, "Photo library authorization");
        match status {
            LibraryAuthorization::Authorized => {
                AuthorizeResult::Success(Session::local(SourceKind::SystemAlbum))
            }
            LibraryAuthorization::Denied
            | LibraryAuthorization::Restricted
            | LibraryAuthorization::NotDetermined => AuthorizeResult::Fail(
                ProviderError::PermissionDenied(format!("photo library access is {status:?}")),
            ),
        }
    }

    /// Keeps assets whose duration is at least `query.min_duration`,
    /// boundary included.
    async fn fetch_media(
        &self,
        session: &Session,
        query: &MediaQuery,
    ) -> Result<Vec<MediaAsset>, ProviderError> {
        require_session(session, SourceKind::SystemAlbum)?;
        let assets: Vec<MediaAsset> = self
            .library
            .fetch_assets(query.media_type)
            .await?
            .into_iter()
            .filter(|a| query.accepts_duration(a.duration))
            .map(MediaAsset::from)
            .collect();
        tracing::debug!(
            media_type = %query.media_type,
            min_duration = query.min_duration,
            count = assets.len(),
            "Listed album media"
        );
        Ok(assets)
    }
}
