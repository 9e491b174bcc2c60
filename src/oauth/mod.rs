//! OAuth2 authorization-code grant for the social providers.
//!
//! [`OAuthFlow`] is the state machine; [`run_flow`] drives it with events
//! from a [`UserAgent`] (the component that shows the authorize page) and
//! resolves to a single [`FlowOutcome`].

pub mod agent;
pub mod encode;
pub mod flow;
pub mod traits;

pub use agent::{ConsoleAgent, ReplayAgent};
pub use encode::encode_host_component;
pub use flow::{
    extract_code, parse_token_response, OAuthClientConfig, OAuthFlow, DEFAULT_ACCESS_TOKEN_PATH,
    DEFAULT_AUTHORIZE_PATH,
};
pub use traits::{
    AccessToken, FlowOutcome, FlowState, FlowStep, NavigationEvent, NavigationPolicy, OAuthError,
    TokenGrant, UserAgent,
};

use crate::runtime::CancellationToken;
use reqwest::Client;
use tokio::sync::mpsc;

const NAVIGATION_BUFFER: usize = 16;

/// Run `flow` to a terminal outcome.
///
/// The outcome fires once, after the exchange completes, the provider
/// denies access, the user closes the page, or `cancel` fires. Closing
/// and cancelling both resolve as [`FlowOutcome::Cancelled`].
pub async fn run_flow(
    flow: &mut OAuthFlow,
    agent: &dyn UserAgent,
    client: &Client,
    cancel: &CancellationToken,
) -> FlowOutcome {
    let url = match flow.start() {
        Ok(url) => url,
        Err(error) => return FlowOutcome::Failed(error),
    };

    let (tx, mut rx) = mpsc::channel(NAVIGATION_BUFFER);
    tracing::info!(agent = agent.name(), "Opening OAuth authorize page");
    if let Err(error) = agent.open(url, tx).await {
        flow.cancel();
        return FlowOutcome::Failed(error);
    }

    let drive = async {
        while let Some(event) = rx.recv().await {
            match event {
                NavigationEvent::Navigated(url) => {
                    flow.on_navigation(&url);
                }
                NavigationEvent::Finished => match flow.on_navigation_finished() {
                    FlowStep::Continue => {}
                    FlowStep::ExchangeCode => {
                        return Some(match flow.exchange(client).await {
                            Ok(grant) => FlowOutcome::Authorized(grant),
                            Err(error) => FlowOutcome::Failed(error),
                        });
                    }
                    FlowStep::Failed(error) => return Some(FlowOutcome::Failed(error)),
                },
                NavigationEvent::Closed => return None,
            }
        }
        None
    };

    match cancel.run_until_cancelled(drive).await.flatten() {
        Some(outcome) => outcome,
        None => {
            flow.cancel();
            tracing::info!("OAuth flow cancelled");
            FlowOutcome::Cancelled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve, StubResponse};
    use async_trait::async_trait;
    use reqwest::Url;

    fn config(base_url: &str) -> OAuthClientConfig {
        OAuthClientConfig {
            base_url: base_url.to_string(),
            authorize_path: DEFAULT_AUTHORIZE_PATH.to_string(),
            access_token_path: DEFAULT_ACCESS_TOKEN_PATH.to_string(),
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec!["basic".to_string()],
            redirect_uri: "https://app.example.com/cb".to_string(),
        }
    }

    /// Shows the page and never reports anything.
    struct SilentAgent;

    #[async_trait]
    impl UserAgent for SilentAgent {
        async fn open(
            &self,
            _url: Url,
            events: mpsc::Sender<NavigationEvent>,
        ) -> Result<(), OAuthError> {
            tokio::spawn(async move {
                events.closed().await;
            });
            Ok(())
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    #[tokio::test]
    async fn redirect_with_code_authorizes() {
        let server = serve(vec![(
            "/oauth/access_token",
            StubResponse::json(serde_json::json!({"access_token": "T"})),
        )])
        .await;
        let mut flow = OAuthFlow::new(config(&server.base_url()));
        let agent = ReplayAgent::new(vec![
            NavigationEvent::Navigated(format!("{}/login", server.base_url())),
            NavigationEvent::Finished,
            NavigationEvent::Navigated("https://app.example.com/cb?code=ABC123".to_string()),
            NavigationEvent::Finished,
        ]);

        let outcome = run_flow(&mut flow, &agent, &Client::new(), &CancellationToken::new()).await;
        match outcome {
            FlowOutcome::Authorized(grant) => assert_eq!(grant.access_token.secret(), "T"),
            other => panic!("expected authorization, got {other:?}"),
        }
        assert_eq!(flow.state(), FlowState::Success);
        assert_eq!(server.hits("/oauth/access_token"), 1);
        assert!(agent.opened()[0]
            .as_str()
            .starts_with(&format!("{}/oauth/authorize?client_id=cid", server.base_url())));
    }

    #[tokio::test]
    async fn token_error_fails() {
        let server = serve(vec![(
            "/oauth/access_token",
            StubResponse::json(serde_json::json!({"error": "invalid_grant"})),
        )])
        .await;
        let mut flow = OAuthFlow::new(config(&server.base_url()));
        let agent = ReplayAgent::redirect_to("https://app.example.com/cb?code=ABC123");

        let outcome = run_flow(&mut flow, &agent, &Client::new(), &CancellationToken::new()).await;
        assert!(matches!(outcome, FlowOutcome::Failed(OAuthError::Denied(_))));
        assert!(flow.grant().is_none());
    }

    #[tokio::test]
    async fn closing_the_page_cancels() {
        let mut flow = OAuthFlow::new(config("https://auth.example.com"));
        let agent = ReplayAgent::new(vec![NavigationEvent::Closed]);
        let outcome = run_flow(&mut flow, &agent, &Client::new(), &CancellationToken::new()).await;
        assert!(matches!(outcome, FlowOutcome::Cancelled));
        assert_eq!(flow.state(), FlowState::Cancelled);
    }

    #[tokio::test]
    async fn script_ending_without_code_cancels() {
        let mut flow = OAuthFlow::new(config("https://auth.example.com"));
        let agent = ReplayAgent::new(vec![NavigationEvent::Finished]);
        let outcome = run_flow(&mut flow, &agent, &Client::new(), &CancellationToken::new()).await;
        assert!(matches!(outcome, FlowOutcome::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_token_resolves_pending_flow() {
        let mut flow = OAuthFlow::new(config("https://auth.example.com"));
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let outcome = run_flow(&mut flow, &SilentAgent, &Client::new(), &token).await;
        assert!(matches!(outcome, FlowOutcome::Cancelled));
        assert_eq!(flow.state(), FlowState::Cancelled);
    }

    #[tokio::test]
    async fn flow_cannot_be_reused() {
        let mut flow = OAuthFlow::new(config("https://auth.example.com"));
        let agent = ReplayAgent::new(vec![NavigationEvent::Closed]);
        let _ = run_flow(&mut flow, &agent, &Client::new(), &CancellationToken::new()).await;
        let again = run_flow(&mut flow, &agent, &Client::new(), &CancellationToken::new()).await;
        assert!(matches!(
            again,
            FlowOutcome::Failed(OAuthError::InvalidState { .. })
        ));
    }
}
