use reqwest::Url;
use std::path::{Path, PathBuf};

use super::traits::{AssetMediaType, MediaAsset, SourceKind};

/// Suffix marking sandbox videos.
pub const VIDEO_SUFFIX: &str = ".mov";
/// Suffix marking sandbox images. Case-sensitive, as the camera writes it.
pub const IMAGE_SUFFIX: &str = ".JPG";

/// App-local media directory. Files carry no sidecar metadata; the media
/// type comes from the file name suffix alone.
pub struct SandboxDirectory {
    base_dir: PathBuf,
}

/// Media type implied by a sandbox file name, if any.
pub fn classify(file_name: &str) -> Option<AssetMediaType> {
    if file_name.ends_with(VIDEO_SUFFIX) {
        Some(AssetMediaType::Video)
    } else if file_name.ends_with(IMAGE_SUFFIX) {
        Some(AssetMediaType::Image)
    } else {
        None
    }
}

impl SandboxDirectory {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.base_dir
    }

    /// Files of `media_type`, in directory enumeration order. Only videos
    /// and images live in the sandbox; other types list nothing.
    pub async fn list(&self, media_type: AssetMediaType) -> std::io::Result<Vec<MediaAsset>> {
        if !matches!(media_type, AssetMediaType::Video | AssetMediaType::Image) {
            return Ok(Vec::new());
        }
        let mut entries = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut results = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if classify(&file_name) != Some(media_type) {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let Ok(url) = Url::from_file_path(&path) else {
                tracing::warn!(
                    path = %path.display(),
                    "Skipping sandbox file with non-absolute path"
                );
                continue;
            };
            results.push(MediaAsset {
                identifier: url.to_string(),
                media_type,
                source: SourceKind::Sandbox,
                source_url: Some(url),
                thumbnail_url: None,
                duration: 0.0,
                coordinate: None,
            });
        }
        Ok(results)
    }
}

/// Local path of a sandbox asset.
pub fn local_path(asset: &MediaAsset) -> Option<PathBuf> {
    asset
        .source_url
        .as_ref()
        .filter(|url| url.scheme() == "file")
        .and_then(|url| url.to_file_path().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    fn enumeration_order(dir: &Path, suffix: &str) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(suffix))
            .collect()
    }

    #[test]
    fn classify_uses_case_sensitive_suffixes() {
        assert_eq!(classify("clip.mov"), Some(AssetMediaType::Video));
        assert_eq!(classify("IMG_0001.JPG"), Some(AssetMediaType::Image));
        assert_eq!(classify("IMG_0001.jpg"), None);
        assert_eq!(classify("notes.txt"), None);
    }

    #[tokio::test]
    async fn lists_only_requested_type_in_enumeration_order() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.mov", "b.JPG", "c.mov", "d.txt", "e.mov", "f.JPG"] {
            touch(tmp.path(), name);
        }
        let sandbox = SandboxDirectory::new(tmp.path());

        let videos = sandbox.list(AssetMediaType::Video).await.unwrap();
        assert_eq!(videos.len(), 3);
        let listed: Vec<String> = videos
            .iter()
            .map(|a| {
                local_path(a)
                    .unwrap()
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();
        assert_eq!(listed, enumeration_order(tmp.path(), ".mov"));
        assert!(videos.iter().all(|a| a.media_type == AssetMediaType::Video));

        let images = sandbox.list(AssetMediaType::Image).await.unwrap();
        assert_eq!(images.len(), 2);
    }

    #[tokio::test]
    async fn identifier_is_file_url() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "clip.mov");
        let assets = SandboxDirectory::new(tmp.path())
            .list(AssetMediaType::Video)
            .await
            .unwrap();
        assert!(assets[0].identifier.starts_with("file://"));
        assert_eq!(assets[0].source, SourceKind::Sandbox);
        assert_eq!(local_path(&assets[0]), Some(tmp.path().join("clip.mov")));
    }

    #[tokio::test]
    async fn other_types_list_nothing() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "clip.mov");
        let sandbox = SandboxDirectory::new(tmp.path());
        assert!(sandbox.list(AssetMediaType::LivePhoto).await.unwrap().is_empty());
        assert!(sandbox.list(AssetMediaType::Unknown).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let sandbox = SandboxDirectory::new(&tmp.path().join("absent"));
        assert!(sandbox.list(AssetMediaType::Video).await.unwrap().is_empty());
    }
}
