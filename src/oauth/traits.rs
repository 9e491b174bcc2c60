use async_trait::async_trait;
use reqwest::Url;
use std::fmt;
use tokio::sync::mpsc;

/// Bearer credential for the media-list endpoints. `Debug` never prints
/// the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Result of a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: AccessToken,
    /// Lifetime in seconds, when the token endpoint reports one.
    pub expires_in: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("invalid OAuth URL: {0}")]
    InvalidUrl(String),
    #[error("token request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("token response is not usable JSON: {0}")]
    Json(String),
    #[error("authorization denied: {0}")]
    Denied(String),
    #[error("token response carried no access_token")]
    MissingToken,
    #[error("flow is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: FlowState,
        actual: FlowState,
    },
    #[error("user agent failed: {0}")]
    UserAgent(String),
}

/// Lifecycle of one authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingCode,
    ExchangingCode,
    Success,
    Failure,
    Cancelled,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Cancelled)
    }
}

/// Whether the user agent may follow a navigation. The flow only observes
/// navigations, so every one is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationPolicy {
    Allow,
}

/// What the flow wants after a page finished loading.
#[derive(Debug)]
pub enum FlowStep {
    /// Keep waiting for navigations.
    Continue,
    /// A code was captured; exchange it now.
    ExchangeCode,
    /// The provider redirected with an error.
    Failed(OAuthError),
}

/// Events reported by the component showing the authorize page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// The agent is about to load this address.
    Navigated(String),
    /// The current page finished loading.
    Finished,
    /// The user closed the page.
    Closed,
}

/// Terminal outcome of [`run_flow`](super::run_flow). Resolves exactly
/// once per flow.
#[derive(Debug)]
pub enum FlowOutcome {
    Authorized(TokenGrant),
    Failed(OAuthError),
    Cancelled,
}

/// The web-view equivalent: shows the authorize page to the user and
/// reports navigations on `events`.
///
/// `open` must return once the page is shown; navigation reporting runs
/// in the background. Dropping `events` counts as the user closing the page.
#[async_trait]
pub trait UserAgent: Send + Sync {
    async fn open(&self, url: Url, events: mpsc::Sender<NavigationEvent>)
        -> Result<(), OAuthError>;

    fn name(&self) -> &str;
}
