use parking_lot::Mutex;
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::traits::{FetchError, FetchOptions, MediaFetcher, PlayableAsset, PlayableOrigin};
use crate::runtime::CancellationToken;

/// Hex digits of the URL digest kept in cache file names.
const NAME_DIGEST_CHARS: usize = 32;
const CACHE_EXTENSION: &str = "mp4";

/// Download cache for remote videos. Each URL maps to one deterministic
/// file; an existing file is reused as-is without re-validation.
pub struct DownloadCache {
    dir: PathBuf,
    options: FetchOptions,
    in_flight: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl DownloadCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            options: FetchOptions::default(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file for `url`. Stable across processes.
    pub fn path_for(&self, url: &Url) -> PathBuf {
        let digest = hex::encode(Sha256::digest(url.as_str().as_bytes()));
        self.dir
            .join(format!("{}.{CACHE_EXTENSION}", &digest[..NAME_DIGEST_CHARS]))
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        self.in_flight
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }

    fn release(&self, path: &Path, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock();
        // One reference in the map, one held here: nobody else is waiting.
        if Arc::strong_count(&lock) <= 2 {
            in_flight.remove(path);
        }
    }

    /// Return a local copy of `url`, downloading it if absent. Concurrent
    /// calls for the same URL wait for a single download.
    pub async fn fetch(
        &self,
        url: &Url,
        fetcher: &dyn MediaFetcher,
        cancel: &CancellationToken,
    ) -> Result<PlayableAsset, FetchError> {
        let path = self.path_for(url);
        let lock = self.lock_for(&path);
        let result = {
            let guard = cancel.run_until_cancelled(lock.lock()).await;
            match guard {
                Some(_guard) => self.fetch_locked(url, &path, fetcher, cancel).await,
                None => Err(FetchError::Cancelled),
            }
        };
        self.release(&path, lock);
        result
    }

    async fn fetch_locked(
        &self,
        url: &Url,
        path: &Path,
        fetcher: &dyn MediaFetcher,
        cancel: &CancellationToken,
    ) -> Result<PlayableAsset, FetchError> {
        if tokio::fs::try_exists(path).await? {
            tracing::debug!(url = %url, path = %path.display(), "Download cache hit");
            return Ok(PlayableAsset {
                path: path.to_path_buf(),
                origin: PlayableOrigin::Cached,
            });
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let media = fetcher.fetch(url, &self.options, cancel).await?;

        let partial = path.with_extension(format!("{CACHE_EXTENSION}.part"));
        tokio::fs::write(&partial, &media.data).await?;
        tokio::fs::rename(&partial, path).await?;

        tracing::info!(
            url = %url,
            path = %path.display(),
            bytes = media.size_bytes,
            "Downloaded media into cache"
        );
        Ok(PlayableAsset {
            path: path.to_path_buf(),
            origin: PlayableOrigin::Downloaded,
        })
    }
}
