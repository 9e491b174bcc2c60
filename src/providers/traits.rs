use async_trait::async_trait;

use crate::media::{FetchError, MediaAsset, MediaQuery, SourceKind};
use crate::oauth::OAuthError;
use crate::runtime::CancellationToken;
use crate::sessions::Session;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed JSON from {provider}: {detail}")]
    Json { provider: SourceKind, detail: String },
    #[error("missing field '{0}'")]
    MissingField(String),
    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("{0} requires authorization; call authorize first")]
    Unauthorized(SourceKind),
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: SourceKind,
        status: u16,
        body: String,
    },
    #[error("{0} is unavailable: {1}")]
    Unavailable(SourceKind, String),
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    OAuth(#[from] OAuthError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Terminal outcome of an authorize attempt.
#[derive(Debug)]
pub enum AuthorizeResult {
    /// Access granted; pass the session to `fetch_media`.
    Success(Session),
    Fail(ProviderError),
    /// The user closed the authorization page or the caller cancelled.
    Cancelled,
}

impl AuthorizeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_session(self) -> Option<Session> {
        match self {
            Self::Success(session) => Some(session),
            _ => None,
        }
    }
}

/// A source of media assets.
///
/// Implementations hide source-specific authorization and listing. The
/// caller owns the [`Session`] returned by [`authorize`](Self::authorize)
/// and hands it back to [`fetch_media`](Self::fetch_media).
#[async_trait]
pub trait MediaProvider: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Obtain access to the source. Resolves exactly once.
    async fn authorize(&self, cancel: &CancellationToken) -> AuthorizeResult;

    /// List assets matching `query`. Fails with
    /// [`ProviderError::Unauthorized`] when `session` is not a live
    /// session for this provider.
    async fn fetch_media(
        &self,
        session: &Session,
        query: &MediaQuery,
    ) -> Result<Vec<MediaAsset>, ProviderError>;

    fn name(&self) -> &str {
        self.kind().as_str()
    }
}

/// Reject sessions that do not belong to `kind` or have lapsed.
pub(crate) fn require_session(session: &Session, kind: SourceKind) -> Result<(), ProviderError> {
    if session.is_valid_for(kind) {
        Ok(())
    } else {
        Err(ProviderError::Unauthorized(kind))
    }
}
