use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::remote::{collect_assets, media_entries, required_url, RemoteClient, RemoteEndpoints};
use super::traits::{AuthorizeResult, MediaProvider, ProviderError};
use crate::media::{AssetMediaType, Coordinate, MediaAsset, MediaQuery, SourceKind};
use crate::oauth::{OAuthClientConfig, UserAgent, DEFAULT_ACCESS_TOKEN_PATH, DEFAULT_AUTHORIZE_PATH};
use crate::runtime::CancellationToken;
use crate::sessions::Session;

pub const INSTAGRAM_BASE_URL: &str = "https://api.instagram.com";
pub const INSTAGRAM_MEDIA_URL: &str = "https://api.instagram.com/v1/users/self/media/recent";

/// Recent videos of the authorized Instagram user.
pub struct InstagramProvider {
    remote: RemoteClient,
}

impl InstagramProvider {
    pub fn new(endpoints: RemoteEndpoints, client: Client, agent: Arc<dyn UserAgent>) -> Self {
        Self {
            remote: RemoteClient::new(SourceKind::Instagram, endpoints, client, agent),
        }
    }

    /// Production endpoints for the given client registration.
    pub fn default_endpoints(
        client_id: &str,
        client_secret: &str,
        scopes: Vec<String>,
        redirect_uri: &str,
    ) -> RemoteEndpoints {
        RemoteEndpoints {
            oauth: OAuthClientConfig {
                base_url: INSTAGRAM_BASE_URL.to_string(),
                authorize_path: DEFAULT_AUTHORIZE_PATH.to_string(),
                access_token_path: DEFAULT_ACCESS_TOKEN_PATH.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                scopes,
                redirect_uri: redirect_uri.to_string(),
            },
            media_url: INSTAGRAM_MEDIA_URL.to_string(),
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
    let thumbnail = required_url(entry, "/images/thumbnail/url")?;
    let video = required_url(entry, "/videos/standard_resolution/url")?;
    let coordinate = match (
        entry.pointer("/location/latitude").and_then(Value::as_f64),
        entry.pointer("/location/longitude").and_then(Value::as_f64),
    ) {
        (Some(latitude), Some(longitude)) => Some(Coordinate {
            latitude,
            longitude,
        }),
        _ => None,
    };
    Ok(
        MediaAsset::remote(SourceKind::Instagram, AssetMediaType::Video, video, thumbnail)
            .with_coordinate(coordinate),
    )
}

/// Assets in an Instagram recent-media response. Entries without a video
/// or thumbnail (plain photo posts among them) are skipped.
pub fn parse_media_list(body: &Value) -> Result<Vec<MediaAsset>, ProviderError> {
    let entries = media_entries(SourceKind::Instagram, body)?;
    Ok(collect_assets(SourceKind::Instagram, entries, parse_entry))
}

#[async_trait]
impl MediaProvider for InstagramProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Instagram
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
        tracing::info!(provider = "instagram", count = assets.len(), "Listed media");
        Ok(assets)
    }
}
