//! Plumbing shared by the OAuth-backed providers: authorization through
//! [`run_flow`], the authenticated media-list request, and tolerant parsing
//! of the returned `data[]` array.

use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::traits::{require_session, AuthorizeResult, ProviderError};
use crate::media::{MediaAsset, SourceKind};
use crate::oauth::{run_flow, FlowOutcome, OAuthClientConfig, OAuthFlow, UserAgent};
use crate::runtime::CancellationToken;
use crate::sessions::Session;
use crate::util::sanitize_api_error;

pub const LIST_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Where a social provider authorizes and lists media.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEndpoints {
    pub oauth: OAuthClientConfig,
    /// Media-list endpoint. The access token is appended as a query
    /// parameter.
    pub media_url: String,
}

pub struct RemoteClient {
    kind: SourceKind,
    endpoints: RemoteEndpoints,
    client: Client,
    agent: Arc<dyn UserAgent>,
    timeout: Duration,
}

impl RemoteClient {
    pub fn new(
        kind: SourceKind,
        endpoints: RemoteEndpoints,
        client: Client,
        agent: Arc<dyn UserAgent>,
    ) -> Self {
        Self {
            kind,
            endpoints,
            client,
            agent,
            timeout: LIST_REQUEST_TIMEOUT,
        }
    }

    /// Timeout of the media-list request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn endpoints(&self) -> &RemoteEndpoints {
        &self.endpoints
    }

    pub async fn authorize(&self, cancel: &CancellationToken) -> AuthorizeResult {
        let mut flow = OAuthFlow::new(self.endpoints.oauth.clone());
        match run_flow(&mut flow, self.agent.as_ref(), &self.client, cancel).await {
            FlowOutcome::Authorized(grant) => {
                tracing::info!(
                    provider = %self.kind,
                    expires_in = ?grant.expires_in,
                    "Authorized"
                );
                AuthorizeResult::Success(Session::from_grant(self.kind, &grant))
            }
            FlowOutcome::Failed(error) => {
                tracing::warn!(provider = %self.kind, "Authorization failed: {error}");
                AuthorizeResult::Fail(ProviderError::OAuth(error))
            }
            FlowOutcome::Cancelled => AuthorizeResult::Cancelled,
        }
    }

    fn media_list_url(&self, access_token: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.endpoints.media_url)
            .map_err(|e| ProviderError::InvalidUrl(format!("{}: {e}", self.endpoints.media_url)))?;
        url.query_pairs_mut()
            .append_pair("access_token", access_token);
        Ok(url)
    }

    /// GET the media list with the session's token and decode the body.
    pub async fn fetch_media_list(&self, session: &Session) -> Result<Value, ProviderError> {
        require_session(session, self.kind)?;
        let token = session
            .access_token()
            .ok_or(ProviderError::Unauthorized(self.kind))?;
        let url = self.media_list_url(token.secret())?;

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.without_url()))?;

        if !response.status().is_success() {
            return Err(api_error(self.kind, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.without_url()))?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Json {
            provider: self.kind,
            detail: e.to_string(),
        })
    }
}

/// Build a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: SourceKind, response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    ProviderError::Api {
        provider,
        status,
        body: sanitize_api_error(&body),
    }
}

/// The `data` array of a media-list response.
pub fn media_entries(provider: SourceKind, body: &Value) -> Result<&[Value], ProviderError> {
    body.get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| ProviderError::Json {
            provider,
            detail: "response has no 'data' array".to_string(),
        })
}

pub fn required_str<'a>(entry: &'a Value, pointer: &str) -> Result<&'a str, ProviderError> {
    entry
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::MissingField(pointer.to_string()))
}

pub fn required_url(entry: &Value, pointer: &str) -> Result<Url, ProviderError> {
    let raw = required_str(entry, pointer)?;
    Url::parse(raw).map_err(|e| ProviderError::InvalidUrl(format!("{pointer}: {e}")))
}

pub fn required_f64(entry: &Value, pointer: &str) -> Result<f64, ProviderError> {
    entry
        .pointer(pointer)
        .and_then(Value::as_f64)
        .ok_or_else(|| ProviderError::MissingField(pointer.to_string()))
}

/// Parse every entry, skipping the malformed ones. A bad entry never
/// sinks the batch.
pub fn collect_assets<F>(provider: SourceKind, entries: &[Value], parse: F) -> Vec<MediaAsset>
where
    F: Fn(&Value) -> Result<MediaAsset, ProviderError>,
{
    let mut assets = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match parse(entry) {
            Ok(asset) => assets.push(asset),
            Err(error) => {
                tracing::warn!(%provider, index, "Skipping media entry: {error}");
            }
        }
    }
    assets
}
