use async_trait::async_trait;
use std::path::Path;

use super::traits::{require_session, AuthorizeResult, MediaProvider, ProviderError};
use crate::media::{MediaAsset, MediaQuery, SandboxDirectory, SourceKind};
use crate::runtime::CancellationToken;
use crate::sessions::Session;

/// Media stored in the application's own directory.
pub struct SandboxProvider {
    directory: SandboxDirectory,
}

impl SandboxProvider {
    pub fn new(dir: &Path) -> Self {
        Self {
            directory: SandboxDirectory::new(dir),
        }
    }

    pub fn dir(&self) -> &Path {
        self.directory.path()
    }
}

#[async_trait]
impl MediaProvider for SandboxProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Sandbox
    }

    async fn authorize(&self, _cancel: &CancellationToken) -> AuthorizeResult {
        AuthorizeResult::Success(Session::local(SourceKind::Sandbox))
    }

    /// No duration filtering: sandbox files carry no duration metadata.
    async fn fetch_media(
        &self,
        session: &Session,
        query: &MediaQuery,
    ) -> Result<Vec<MediaAsset>, ProviderError> {
        require_session(session, SourceKind::Sandbox)?;
        let assets = self.directory.list(query.media_type).await?;
        tracing::debug!(
            dir = %self.directory.path().display(),
            media_type = %query.media_type,
            count = assets.len(),
            "Listed sandbox media"
        );
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::AssetMediaType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn authorize_always_succeeds() {
        let tmp = TempDir::new().unwrap();
        let provider = SandboxProvider::new(tmp.path());
        let result = provider.authorize(&CancellationToken::new()).await;
        let session = result.into_session().unwrap();
        assert_eq!(session.provider, SourceKind::Sandbox);
    }

    #[tokio::test]
    async fn fetch_ignores_min_duration() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.mov"), b"x").unwrap();
        std::fs::write(tmp.path().join("b.mov"), b"x").unwrap();
        let provider = SandboxProvider::new(tmp.path());
        let session = Session::local(SourceKind::Sandbox);

        let query = MediaQuery::new(AssetMediaType::Video).with_min_duration(30.0);
        let assets = provider.fetch_media(&session, &query).await.unwrap();
        assert_eq!(assets.len(), 2);
    }

    #[tokio::test]
    async fn fetch_rejects_foreign_session() {
        let tmp = TempDir::new().unwrap();
        let provider = SandboxProvider::new(tmp.path());
        let session = Session::local(SourceKind::SystemAlbum);
        let err = provider
            .fetch_media(&session, &MediaQuery::new(AssetMediaType::Video))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized(SourceKind::Sandbox)));
    }
}
