//! Session types: the caller-owned holder of a provider's access token.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::media::SourceKind;
use crate::oauth::{AccessToken, TokenGrant};

/// Authorization state for one provider. Local sources carry no token.
///
/// Tokens live in memory only; a `Session` is never serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub provider: SourceKind,
    access_token: Option<AccessToken>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Session for a source that needs no credential.
    pub fn local(provider: SourceKind) -> Self {
        Self {
            provider,
            access_token: None,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Session backed by a token from the OAuth exchange. A lifetime too
    /// large to represent is treated as no expiry.
    pub fn from_grant(provider: SourceKind, grant: &TokenGrant) -> Self {
        let created_at = Utc::now();
        let expires_at = grant
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| created_at.checked_add_signed(lifetime));
        Self {
            provider,
            access_token: Some(grant.access_token.clone()),
            created_at,
            expires_at,
        }
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// Usable for `provider`: right provider, not expired, and holding a
    /// token when the provider is networked.
    pub fn is_valid_for(&self, provider: SourceKind) -> bool {
        self.provider == provider
            && !self.is_expired()
            && (!provider.is_networked() || self.access_token.is_some())
    }

    /// End the session now.
    pub fn expire(&mut self) {
        self.expires_at = Some(Utc::now());
    }
}

/// Filter criteria for listing sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub provider: Option<SourceKind>,
    pub include_expired: bool,
}

/// In-process storage of sessions, at most one per provider.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `session`, replacing any session of the same provider.
    async fn put(&self, session: Session) -> Result<()>;

    /// The live session for `provider`. Expired sessions are not returned.
    async fn get(&self, provider: SourceKind) -> Result<Option<Session>>;

    /// Expire the session for `provider`, if any.
    async fn expire(&self, provider: SourceKind) -> Result<()>;

    /// Drop the session for `provider`.
    async fn delete(&self, provider: SourceKind) -> Result<()>;

    /// Sessions matching the filter, newest first.
    async fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>>;

    /// The name of this session store implementation.
    fn name(&self) -> &str;
}
