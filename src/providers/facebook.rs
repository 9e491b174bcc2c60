use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::remote::{
    collect_assets, media_entries, required_f64, required_url, RemoteClient, RemoteEndpoints,
};
use super::traits::{AuthorizeResult, MediaProvider, ProviderError};
use crate::media::{AssetMediaType, MediaAsset, MediaQuery, SourceKind};
use crate::oauth::{OAuthClientConfig, UserAgent};
use crate::runtime::CancellationToken;
use crate::sessions::Session;

pub const FACEBOOK_AUTHORIZE_URL: &str = "https://www.facebook.com/v2.8/dialog/oauth";
pub const FACEBOOK_ACCESS_TOKEN_URL: &str = "https://graph.facebook.com/v2.8/oauth/access_token";
pub const FACEBOOK_MEDIA_URL: &str =
    "https://graph.facebook.com/me/videos?fields=created_time,source,length,thumbnails&type=uploaded";

/// Videos uploaded by the authorized Facebook user.
pub struct FacebookProvider {
    remote: RemoteClient,
}

impl FacebookProvider {
    pub fn new(endpoints: RemoteEndpoints, client: Client, agent: Arc<dyn UserAgent>) -> Self {
        Self {
            remote: RemoteClient::new(SourceKind::Facebook, endpoints, client, agent),
        }
    }

    /// Production endpoints. Both OAuth paths are absolute, so the base
    /// URL stays empty.
    pub fn default_endpoints(
        client_id: &str,
        client_secret: &str,
        scopes: Vec<String>,
        redirect_uri: &str,
    ) -> RemoteEndpoints {
        RemoteEndpoints {
            oauth: OAuthClientConfig {
                base_url: String::new(),
                authorize_path: FACEBOOK_AUTHORIZE_URL.to_string(),
                access_token_path: FACEBOOK_ACCESS_TOKEN_URL.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                scopes,
                redirect_uri: redirect_uri.to_string(),
            },
            media_url: FACEBOOK_MEDIA_URL.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.remote = self.remote.with_timeout(timeout);
        self
    }

    pub fn remote(&self) -> &RemoteClient {
        &self.remote
    }

    pub fn endpoints(&self) -> &RemoteEndpoints {
        self.remote.endpoints()
    }
}

fn parse_entry(entry: &Value) -> Result<MediaAsset, ProviderError> {
    let source = required_url(entry, "/source")?;
    let length = required_f64(entry, "/length")?;
    let thumbnail = required_url(entry, "/thumbnails/data/0/uri")?;
    Ok(
        MediaAsset::remote(SourceKind::Facebook, AssetMediaType::Video, source, thumbnail)
            .with_duration(length),
    )
}

/// Assets in a Graph API `me/videos` response. Entries missing the source,
/// the length or a thumbnail are skipped.
pub fn parse_media_list(body: &Value) -> Result<Vec<MediaAsset>, ProviderError> {
    let entries = media_entries(SourceKind::Facebook, body)?;
    Ok(collect_assets(SourceKind::Facebook, entries, parse_entry))
}

#[async_trait]
impl MediaProvider for FacebookProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Facebook
    }

    async fn authorize(&self, cancel: &CancellationToken) -> AuthorizeResult {
        self.remote.authorize(cancel).await
    }

    async fn fetch_media(
        &self,
        session: &Session,
        query: &MediaQuery,
    ) -> Result<Vec<MediaAsset>, ProviderError> {
        let body = self.remote.fetch_media_list(session).await?;
        if query.media_type != AssetMediaType::Video {
            return Ok(Vec::new());
        }
        let assets = parse_media_list(&body)?;
        tracing::info!(provider = "facebook", count = assets.len(), "Listed media");
        Ok(assets)
    }
}
