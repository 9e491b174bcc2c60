use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Url;
use std::io::BufRead;
use tokio::sync::mpsc;

use super::traits::{NavigationEvent, OAuthError, UserAgent};

/// Terminal user agent: the user opens the authorize page in a browser and
/// pastes back the address they were redirected to. An empty line closes
/// the flow.
pub struct ConsoleAgent;

#[async_trait]
impl UserAgent for ConsoleAgent {
    async fn open(
        &self,
        url: Url,
        events: mpsc::Sender<NavigationEvent>,
    ) -> Result<(), OAuthError> {
        eprintln!();
        eprintln!("Open this address in a browser and approve access:");
        eprintln!("  {url}");
        eprintln!();
        eprintln!("Then paste the address you were redirected to (empty line cancels):");

        // Read on a plain thread; a stdin read owned by the runtime blocks
        // its shutdown until a line arrives.
        std::thread::Builder::new()
            .name("redirect-reader".to_string())
            .spawn(move || {
                for event in read_redirect(std::io::stdin().lock()) {
                    if events.blocking_send(event).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| OAuthError::UserAgent(format!("cannot read stdin: {e}")))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Events for one pasted line: the redirect followed by page completion,
/// or `Closed` for an empty line or end of input.
fn read_redirect(mut input: impl BufRead) -> Vec<NavigationEvent> {
    let mut line = String::new();
    if let Err(error) = input.read_line(&mut line) {
        tracing::warn!("Failed to read redirect address: {error}");
        line.clear();
    }
    let redirect = line.trim();
    if redirect.is_empty() {
        return vec![NavigationEvent::Closed];
    }
    vec![
        NavigationEvent::Navigated(redirect.to_string()),
        NavigationEvent::Finished,
    ]
}

/// Replays a fixed navigation script. Suits hosts that intercept the
/// redirect themselves and only need the exchange half of the flow.
pub struct ReplayAgent {
    script: Vec<NavigationEvent>,
    opened: Mutex<Vec<Url>>,
}

impl ReplayAgent {
    pub fn new(script: Vec<NavigationEvent>) -> Self {
        Self {
            script,
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Script for a redirect to `redirect` followed by page completion.
    pub fn redirect_to(redirect: &str) -> Self {
        Self::new(vec![
            NavigationEvent::Navigated(redirect.to_string()),
            NavigationEvent::Finished,
        ])
    }

    /// Addresses this agent was asked to open, oldest first.
    pub fn opened(&self) -> Vec<Url> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl UserAgent for ReplayAgent {
    async fn open(
        &self,
        url: Url,
        events: mpsc::Sender<NavigationEvent>,
    ) -> Result<(), OAuthError> {
        self.opened.lock().push(url);
        let script = self.script.clone();
        tokio::spawn(async move {
            for event in script {
                if events.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "replay"
    }
}
