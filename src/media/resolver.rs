use std::sync::Arc;

use super::cache::DownloadCache;
use super::local::local_path;
use super::traits::{
    AssetMediaType, FetchOptions, MediaAsset, MediaFetcher, PlayableAsset, PlayableOrigin,
    SourceKind, Thumbnail,
};
use crate::providers::{PhotoLibrary, ProviderError};
use crate::runtime::CancellationToken;

/// Turns listed assets into thumbnails and playable local files.
pub struct AssetResolver {
    fetcher: Arc<dyn MediaFetcher>,
    cache: DownloadCache,
    library: Option<Arc<dyn PhotoLibrary>>,
    thumbnail_options: FetchOptions,
}

impl AssetResolver {
    pub fn new(fetcher: Arc<dyn MediaFetcher>, cache: DownloadCache) -> Self {
        Self {
            fetcher,
            cache,
            library: None,
            thumbnail_options: FetchOptions::default().images_only(),
        }
    }

    pub fn with_library(mut self, library: Arc<dyn PhotoLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    /// Apply `options` to thumbnail downloads. Thumbnails stay restricted
    /// to images.
    pub fn with_thumbnail_options(mut self, options: FetchOptions) -> Self {
        self.thumbnail_options = options.images_only();
        self
    }

    pub fn thumbnail_options(&self) -> &FetchOptions {
        &self.thumbnail_options
    }

    pub fn cache(&self) -> &DownloadCache {
        &self.cache
    }

    /// Thumbnail bytes for remote assets. Sandbox and album assets have no
    /// downloadable thumbnail and yield `None`.
    pub async fn thumbnail(
        &self,
        asset: &MediaAsset,
        cancel: &CancellationToken,
    ) -> Result<Option<Thumbnail>, ProviderError> {
        if !asset.source.is_networked() {
            return Ok(None);
        }
        let Some(url) = asset.thumbnail_url.as_ref() else {
            return Ok(None);
        };
        let media = self
            .fetcher
            .fetch(url, &self.thumbnail_options, cancel)
            .await?;
        Ok(Some(Thumbnail {
            data: media.data,
            mime_type: media.mime_type,
        }))
    }

    /// A local file a player can open. Only videos are playable.
    pub async fn playable(
        &self,
        asset: &MediaAsset,
        cancel: &CancellationToken,
    ) -> Result<Option<PlayableAsset>, ProviderError> {
        if asset.media_type != AssetMediaType::Video {
            return Ok(None);
        }
        match asset.source {
            SourceKind::Sandbox => Ok(local_path(asset).map(|path| PlayableAsset {
                path,
                origin: PlayableOrigin::Local,
            })),
            SourceKind::SystemAlbum => {
                let Some(library) = self.library.as_ref() else {
                    return Err(ProviderError::Unavailable(
                        SourceKind::SystemAlbum,
                        "no photo library attached".to_string(),
                    ));
                };
                let path = library.playable_path(&asset.identifier).await?;
                Ok(path.map(|path| PlayableAsset {
                    path,
                    origin: PlayableOrigin::Library,
                }))
            }
            SourceKind::Instagram | SourceKind::Facebook => {
                let Some(url) = asset.source_url.as_ref() else {
                    return Ok(None);
                };
                let playable = self.cache.fetch(url, self.fetcher.as_ref(), cancel).await?;
                Ok(Some(playable))
            }
        }
    }
}
