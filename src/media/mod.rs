pub mod cache;
pub mod fetcher;
pub mod local;
pub mod resolver;
pub mod traits;

pub use cache::DownloadCache;
pub use fetcher::HttpMediaFetcher;
pub use local::{classify, local_path, SandboxDirectory};
pub use resolver::AssetResolver;
pub use traits::{
    duration_at_least, AssetMediaType, Coordinate, FetchError, FetchOptions, FetchedMedia,
    MediaAsset, MediaFetcher, MediaQuery, PlayableAsset, PlayableOrigin, SourceKind, Thumbnail,
    DURATION_EPSILON,
};

use std::path::Path;

use crate::config::HttpConfig;
use std::sync::Arc;

pub fn create_media_fetcher(client: reqwest::Client) -> Arc<dyn MediaFetcher> {
    Arc::new(HttpMediaFetcher::new(client))
}

pub fn create_download_cache(dir: &Path, http: &HttpConfig) -> DownloadCache {
    DownloadCache::new(dir).with_options(http.fetch_options())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn download_cache_takes_http_limits() {
        let tmp = tempfile::TempDir::new().unwrap();
        let http = HttpConfig {
            timeout_secs: 9,
            max_download_bytes: 1024,
            ..HttpConfig::default()
        };
        let cache = create_download_cache(tmp.path(), &http);
        assert_eq!(cache.options().timeout, Duration::from_secs(9));
        assert_eq!(cache.options().max_size_bytes, 1024);
    }

    #[test]
    fn thumbnail_options_stay_images_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        let http = HttpConfig {
            timeout_secs: 9,
            ..HttpConfig::default()
        };
        let resolver = AssetResolver::new(
            create_media_fetcher(reqwest::Client::new()),
            create_download_cache(tmp.path(), &http),
        )
        .with_thumbnail_options(http.fetch_options());
        let options = resolver.thumbnail_options();
        assert_eq!(options.timeout, Duration::from_secs(9));
        assert_eq!(options.allowed_mime_types, Some(vec!["image/".to_string()]));
    }
}
