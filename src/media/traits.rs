use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::runtime::CancellationToken;

/// Tolerance used by [`duration_at_least`]. Matches the single-precision
/// epsilon the host photo library compares durations with.
pub const DURATION_EPSILON: f64 = f32::EPSILON as f64;

/// Kind of media an asset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AssetMediaType {
    #[default]
    Unknown,
    Image,
    LivePhoto,
    Video,
}

impl AssetMediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Image => "image",
            Self::LivePhoto => "live-photo",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for AssetMediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetMediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "image" | "photo" => Ok(Self::Image),
            "live-photo" | "livephoto" | "live_photo" => Ok(Self::LivePhoto),
            "video" => Ok(Self::Video),
            other => Err(format!(
                "unknown media type '{other}'. Expected one of: image, live-photo, video, unknown"
            )),
        }
    }
}

/// Where an asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Sandbox,
    #[serde(rename = "album")]
    SystemAlbum,
    Instagram,
    Facebook,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Sandbox,
        SourceKind::SystemAlbum,
        SourceKind::Instagram,
        SourceKind::Facebook,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::SystemAlbum => "album",
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
        }
    }

    /// Remote sources need an OAuth session and serve assets over HTTP.
    pub fn is_networked(self) -> bool {
        matches!(self, Self::Instagram | Self::Facebook)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "local" => Ok(Self::Sandbox),
            "album" | "system" | "system-album" | "photos" => Ok(Self::SystemAlbum),
            "instagram" | "ig" => Ok(Self::Instagram),
            "facebook" | "fb" => Ok(Self::Facebook),
            other => Err(format!(
                "Unknown source: {other}. Supported: sandbox, album, instagram, facebook"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single media item with its identifying metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub identifier: String,
    pub media_type: AssetMediaType,
    pub source: SourceKind,
    pub source_url: Option<Url>,
    pub thumbnail_url: Option<Url>,
    /// Seconds. Zero when the source does not report one.
    pub duration: f64,
    pub coordinate: Option<Coordinate>,
}

impl MediaAsset {
    /// Asset served over HTTP. The identifier is the source URL.
    pub fn remote(
        source: SourceKind,
        media_type: AssetMediaType,
        source_url: Url,
        thumbnail_url: Url,
    ) -> Self {
        Self {
            identifier: source_url.to_string(),
            media_type,
            source,
            source_url: Some(source_url),
            thumbnail_url: Some(thumbnail_url),
            duration: 0.0,
            coordinate: None,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_coordinate(mut self, coordinate: Option<Coordinate>) -> Self {
        self.coordinate = coordinate;
        self
    }
}

/// What to list from a provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaQuery {
    pub media_type: AssetMediaType,
    /// Lower bound in seconds, inclusive.
    pub min_duration: f64,
}

impl MediaQuery {
    pub fn new(media_type: AssetMediaType) -> Self {
        Self {
            media_type,
            min_duration: 0.0,
        }
    }

    pub fn with_min_duration(mut self, min_duration: f64) -> Self {
        self.min_duration = min_duration;
        self
    }

    /// Whether an asset of `duration` seconds passes the lower bound.
    pub fn accepts_duration(&self, duration: f64) -> bool {
        duration_at_least(duration, self.min_duration)
    }
}

/// Tolerant `duration >= min`. A duration equal to `min` within
/// [`DURATION_EPSILON`] passes.
pub fn duration_at_least(duration: f64, min: f64) -> bool {
    duration > min || (duration - min).abs() <= DURATION_EPSILON
}

/// Encoded thumbnail bytes. Decoding is left to the caller.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayableOrigin {
    /// A sandbox file, handed back without copying.
    Local,
    /// Exported by the host photo library.
    Library,
    /// Downloaded by this call.
    Downloaded,
    /// Found already present in the download cache.
    Cached,
}

/// A local file that a player can open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayableAsset {
    pub path: PathBuf,
    pub origin: PlayableOrigin,
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub max_size_bytes: u64,
    pub timeout: std::time::Duration,
    /// Content-Type prefixes to accept, e.g. `"image/"`. `None` accepts all.
    pub allowed_mime_types: Option<Vec<String>>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_size_bytes: 512 * 1024 * 1024,
            timeout: std::time::Duration::from_secs(60),
            allowed_mime_types: None,
        }
    }
}

impl FetchOptions {
    pub fn images_only(mut self) -> Self {
        self.allowed_mime_types = Some(vec!["image/".to_string()]);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server answered {status}")]
    Http { status: reqwest::StatusCode },
    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("content type '{0}' not allowed")]
    UnsupportedMime(String),
    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("fetch cancelled")]
    Cancelled,
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &Url,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<FetchedMedia, FetchError>;
    fn name(&self) -> &str;
}
