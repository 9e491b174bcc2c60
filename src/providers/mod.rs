//! Media sources.
//!
//! Every source implements [`MediaProvider`]. [`MediaSource`] closes the set
//! over the four supported sources and is what [`create_provider`] hands
//! out, keyed by the canonical names in [`list_providers`].

pub mod album;
pub mod facebook;
pub mod instagram;
pub mod remote;
pub mod sandbox;
pub mod traits;

pub use album::{
    InMemoryPhotoLibrary, LibraryAsset, LibraryAuthorization, PhotoLibrary, SystemAlbumProvider,
};
pub use facebook::FacebookProvider;
pub use instagram::InstagramProvider;
pub use remote::{RemoteClient, RemoteEndpoints};
pub use sandbox::SandboxProvider;
pub use traits::{AuthorizeResult, MediaProvider, ProviderError};

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

use crate::config::{build_http_client, Config, SocialProviderConfig};
use crate::media::{MediaAsset, MediaQuery, SourceKind};
use crate::oauth::{ConsoleAgent, UserAgent};
use crate::runtime::CancellationToken;
use crate::sessions::{Session, SessionStore};

/// One of the supported sources.
pub enum MediaSource {
    Sandbox(SandboxProvider),
    SystemAlbum(SystemAlbumProvider),
    Instagram(InstagramProvider),
    Facebook(FacebookProvider),
}

#[async_trait]
impl MediaProvider for MediaSource {
    fn kind(&self) -> SourceKind {
        match self {
            Self::Sandbox(_) => SourceKind::Sandbox,
            Self::SystemAlbum(_) => SourceKind::SystemAlbum,
            Self::Instagram(_) => SourceKind::Instagram,
            Self::Facebook(_) => SourceKind::Facebook,
        }
    }

    async fn authorize(&self, cancel: &CancellationToken) -> AuthorizeResult {
        match self {
            Self::Sandbox(p) => p.authorize(cancel).await,
            Self::SystemAlbum(p) => p.authorize(cancel).await,
            Self::Instagram(p) => p.authorize(cancel).await,
            Self::Facebook(p) => p.authorize(cancel).await,
        }
    }

    async fn fetch_media(
        &self,
        session: &Session,
        query: &MediaQuery,
    ) -> Result<Vec<MediaAsset>, ProviderError> {
        match self {
            Self::Sandbox(p) => p.fetch_media(session, query).await,
            Self::SystemAlbum(p) => p.fetch_media(session, query).await,
            Self::Instagram(p) => p.fetch_media(session, query).await,
            Self::Facebook(p) => p.fetch_media(session, query).await,
        }
    }
}

/// Collaborators the factory cannot build from config alone.
#[derive(Clone)]
pub struct ProviderRuntimeOptions {
    /// Shows the OAuth authorize page for the social sources.
    pub agent: Arc<dyn UserAgent>,
    /// Host photo library backing the album source.
    pub library: Option<Arc<dyn PhotoLibrary>>,
    /// Shared HTTP client. Built from `[http]` when absent.
    pub client: Option<Client>,
}

impl Default for ProviderRuntimeOptions {
    fn default() -> Self {
        Self {
            agent: Arc::new(ConsoleAgent),
            library: None,
            client: None,
        }
    }
}

/// Production endpoints for `kind`, with any overrides from `section`.
pub fn social_endpoints(kind: SourceKind, section: &SocialProviderConfig) -> RemoteEndpoints {
    let mut endpoints = match kind {
        SourceKind::Facebook => FacebookProvider::default_endpoints(
            &section.client_id,
            &section.client_secret,
            section.scopes.clone(),
            &section.redirect_url,
        ),
        _ => InstagramProvider::default_endpoints(
            &section.client_id,
            &section.client_secret,
            section.scopes.clone(),
            &section.redirect_url,
        ),
    };
    if let Some(base_url) = &section.base_url {
        endpoints.oauth.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(path) = &section.authorize_path {
        endpoints.oauth.authorize_path.clone_from(path);
    }
    if let Some(path) = &section.access_token_path {
        endpoints.oauth.access_token_path.clone_from(path);
    }
    if let Some(media_url) = &section.media_url {
        endpoints.media_url.clone_from(media_url);
    }
    endpoints
}

/// Factory: create a source by name or alias.
pub fn create_provider(
    name: &str,
    config: &Config,
    options: &ProviderRuntimeOptions,
) -> anyhow::Result<MediaSource> {
    let kind: SourceKind = name.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let client = options
        .client
        .clone()
        .unwrap_or_else(|| build_http_client(&config.http));

    match kind {
        SourceKind::Sandbox => Ok(MediaSource::Sandbox(SandboxProvider::new(
            &config.sandbox_path(),
        ))),
        SourceKind::SystemAlbum => {
            let Some(library) = options.library.clone() else {
                anyhow::bail!(
                    "The album source needs a host photo library; none is available on this platform."
                );
            };
            Ok(MediaSource::SystemAlbum(SystemAlbumProvider::new(library)))
        }
        SourceKind::Instagram | SourceKind::Facebook => {
            let Some(section) = config.social(kind) else {
                anyhow::bail!(
                    "{kind} is not configured. Add a [{kind}] section with client_id, client_secret and redirect_url to {}",
                    config.config_path.display()
                );
            };
            let endpoints = social_endpoints(kind, section);
            let agent = options.agent.clone();
            let timeout = config.http.request_timeout();
            Ok(match kind {
                SourceKind::Instagram => MediaSource::Instagram(
                    InstagramProvider::new(endpoints, client, agent).with_timeout(timeout),
                ),
                _ => MediaSource::Facebook(
                    FacebookProvider::new(endpoints, client, agent).with_timeout(timeout),
                ),
            })
        }
    }
}

/// Reuse the stored session for `source` when it is still live, otherwise
/// authorize and store the new one.
pub async fn ensure_session(
    source: &dyn MediaProvider,
    store: &dyn SessionStore,
    cancel: &CancellationToken,
) -> AuthorizeResult {
    match store.get(source.kind()).await {
        Ok(Some(session)) => return AuthorizeResult::Success(session),
        Ok(None) => {}
        Err(error) => tracing::warn!(provider = source.name(), "Session lookup failed: {error}"),
    }

    let result = source.authorize(cancel).await;
    if let AuthorizeResult::Success(session) = &result {
        if let Err(error) = store.put(session.clone()).await {
            tracing::warn!(provider = source.name(), "Failed to store session: {error}");
        }
    }
    result
}

/// Information about a supported source for display purposes.
pub struct ProviderInfo {
    /// Canonical name accepted on the command line (e.g. `"album"`)
    pub name: &'static str,
    /// Human-readable display name
    pub display_name: &'static str,
    /// Alternative names accepted on the command line
    pub aliases: &'static [&'static str],
    /// Whether the source needs OAuth and network access
    pub networked: bool,
}

/// Return the list of all known sources for display in `mediabridge providers`.
pub fn list_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            name: "sandbox",
            display_name: "App sandbox directory",
            aliases: &["local"],
            networked: false,
        },
        ProviderInfo {
            name: "album",
            display_name: "System photo album",
            aliases: &["system", "system-album", "photos"],
            networked: false,
        },
        ProviderInfo {
            name: "instagram",
            display_name: "Instagram",
            aliases: &["ig"],
            networked: true,
        },
        ProviderInfo {
            name: "facebook",
            display_name: "Facebook",
            aliases: &["fb"],
            networked: true,
        },
    ]
}
