use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

use super::encode::encode_host_component;
use super::traits::{
    AccessToken, FlowState, FlowStep, NavigationPolicy, OAuthError, TokenGrant,
};
use crate::util::sanitize_api_error;

pub const DEFAULT_AUTHORIZE_PATH: &str = "/oauth/authorize";
pub const DEFAULT_ACCESS_TOKEN_PATH: &str = "/oauth/access_token";
pub const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Static client registration for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthClientConfig {
    /// Prefix of both endpoints. Empty when the paths are absolute URLs.
    pub base_url: String,
    pub authorize_path: String,
    pub access_token_path: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
}

impl OAuthClientConfig {
    pub fn authorize_endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.authorize_path)
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.access_token_path)
    }

    /// Redirect URI as it appears on the wire.
    pub fn encoded_redirect_uri(&self) -> String {
        encode_host_component(&self.redirect_uri)
    }

    pub fn scope(&self) -> String {
        self.scopes
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Authorization code carried by a redirect, if any.
///
/// The query is parsed properly so a `code=` inside another parameter's
/// value is not mistaken for the code. Strings that do not parse as URLs
/// fall back to splitting on the literal `code=`, accepted only when it
/// occurs exactly once.
pub fn extract_code(url: &str) -> Option<String> {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty()),
        Err(_) => {
            let segments: Vec<&str> = url.split("code=").collect();
            match segments.as_slice() {
                [_, code] if !code.is_empty() => Some((*code).to_string()),
                _ => None,
            }
        }
    }
}

/// Provider-reported denial on the redirect (`error=access_denied&...`).
fn extract_redirect_error(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut error = None;
    let mut description = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "error" => error = Some(value.into_owned()),
            "error_description" | "error_reason" => {
                description.get_or_insert_with(|| value.into_owned());
            }
            _ => {}
        }
    }
    let error = error?;
    Some(match description {
        Some(desc) if !desc.is_empty() => format!("{error}: {desc}"),
        _ => error,
    })
}

fn describe_error(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

/// Interpret a token endpoint body. Exactly one of `access_token` or
/// `error` is expected.
pub fn parse_token_response(body: &str) -> Result<TokenGrant, OAuthError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| OAuthError::Json(e.to_string()))?;
    let Some(object) = value.as_object() else {
        return Err(OAuthError::Json("expected a JSON object".to_string()));
    };

    if let Some(error) = object.get("error") {
        return Err(OAuthError::Denied(describe_error(error)));
    }

    let token = object
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or(OAuthError::MissingToken)?;

    Ok(TokenGrant {
        access_token: AccessToken::new(token),
        expires_in: object.get("expires_in").and_then(Value::as_u64),
    })
}

/// One authorization-code grant, driven by navigation events.
#[derive(Debug)]
pub struct OAuthFlow {
    config: OAuthClientConfig,
    state: FlowState,
    code: Option<String>,
    redirect_error: Option<String>,
    grant: Option<TokenGrant>,
}

impl OAuthFlow {
    pub fn new(config: OAuthClientConfig) -> Self {
        Self {
            config,
            state: FlowState::Idle,
            code: None,
            redirect_error: None,
            grant: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn grant(&self) -> Option<&TokenGrant> {
        self.grant.as_ref()
    }

    fn require_state(&self, expected: FlowState) -> Result<(), OAuthError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(OAuthError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    fn transition(&mut self, next: FlowState) {
        tracing::debug!(from = ?self.state, to = ?next, "OAuth flow transition");
        self.state = next;
    }

    /// The page the user agent should load.
    pub fn authorize_url(&self) -> Result<Url, OAuthError> {
        let raw = format!(
            "{}?client_id={}&scope={}&response_type=code&redirect_uri={}",
            self.config.authorize_endpoint(),
            urlencoding::encode(&self.config.client_id),
            self.config.scope(),
            self.config.encoded_redirect_uri(),
        );
        Url::parse(&raw).map_err(|e| OAuthError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Body of the code-for-token POST.
    pub fn token_request_body(&self, code: &str) -> String {
        format!(
            "client_id={}&client_secret={}&code={}&grant_type=authorization_code&redirect_uri={}",
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.client_secret),
            urlencoding::encode(code),
            self.config.encoded_redirect_uri(),
        )
    }

    /// Idle → AwaitingCode.
    pub fn start(&mut self) -> Result<Url, OAuthError> {
        self.require_state(FlowState::Idle)?;
        let url = self.authorize_url()?;
        self.transition(FlowState::AwaitingCode);
        Ok(url)
    }

    /// Observe a navigation the user agent is about to perform.
    pub fn on_navigation(&mut self, url: &str) -> NavigationPolicy {
        if self.state != FlowState::AwaitingCode {
            return NavigationPolicy::Allow;
        }
        if let Some(code) = extract_code(url) {
            tracing::debug!("Captured authorization code from redirect");
            self.code = Some(code);
        } else if let Some(error) = extract_redirect_error(url) {
            self.redirect_error = Some(error);
        }
        NavigationPolicy::Allow
    }

    /// A page finished loading. Moves to ExchangingCode once a code has
    /// been captured.
    pub fn on_navigation_finished(&mut self) -> FlowStep {
        if self.state != FlowState::AwaitingCode {
            return FlowStep::Continue;
        }
        if self.code.is_some() {
            self.transition(FlowState::ExchangingCode);
            return FlowStep::ExchangeCode;
        }
        if let Some(error) = self.redirect_error.take() {
            self.transition(FlowState::Failure);
            return FlowStep::Failed(OAuthError::Denied(error));
        }
        FlowStep::Continue
    }

    /// Trade the captured code for a token. No retry.
    pub async fn exchange(&mut self, client: &Client) -> Result<TokenGrant, OAuthError> {
        self.require_state(FlowState::ExchangingCode)?;
        let code = self.code.clone().unwrap_or_default();
        let result = self.request_token(client, &code).await;
        match &result {
            Ok(grant) => {
                self.grant = Some(grant.clone());
                self.transition(FlowState::Success);
            }
            Err(error) => {
                tracing::warn!("OAuth token exchange failed: {error}");
                self.transition(FlowState::Failure);
            }
        }
        result
    }

    async fn request_token(&self, client: &Client, code: &str) -> Result<TokenGrant, OAuthError> {
        let endpoint = self.config.token_endpoint();
        let url = Url::parse(&endpoint)
            .map_err(|e| OAuthError::InvalidUrl(format!("{endpoint}: {e}")))?;

        let response = client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .body(self.token_request_body(code))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_token_response(&body).map_err(|error| match error {
            OAuthError::Json(detail) if !status.is_success() => OAuthError::Json(format!(
                "{detail} (status {status}: {})",
                sanitize_api_error(&body)
            )),
            other => other,
        })
    }

    /// User-initiated cancel from any non-terminal state.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.code = None;
            self.transition(FlowState::Cancelled);
        }
    }
}
