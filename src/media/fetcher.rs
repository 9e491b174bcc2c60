use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use super::traits::{FetchError, FetchOptions, FetchedMedia, MediaFetcher};
use crate::runtime::CancellationToken;

const DEFAULT_MIME: &str = "application/octet-stream";

/// Fetches media bytes over HTTP, streaming the body so oversize
/// responses are cut off early.
pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpMediaFetcher {
    fn default() -> Self {
        Self::new(
            Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        )
    }
}

fn mime_allowed(mime: &str, allowed: Option<&[String]>) -> bool {
    match allowed {
        None => true,
        Some(prefixes) => prefixes.iter().any(|p| mime.starts_with(p.as_str())),
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(
        &self,
        url: &Url,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<FetchedMedia, FetchError> {
        let request = self.client.get(url.clone()).timeout(options.timeout);
        let response = cancel
            .run_until_cancelled(request.send())
            .await
            .ok_or(FetchError::Cancelled)??;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http { status });
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME.to_string());

        if !mime_allowed(&mime_type, options.allowed_mime_types.as_deref()) {
            return Err(FetchError::UnsupportedMime(mime_type));
        }

        let limit = options.max_size_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(FetchError::TooLarge { limit });
        }

        let mut data = Vec::new();
        let mut body = response.bytes_stream();
        loop {
            let Some(next) = cancel.run_until_cancelled(body.next()).await else {
                return Err(FetchError::Cancelled);
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            if (data.len() + chunk.len()) as u64 > limit {
                return Err(FetchError::TooLarge { limit });
            }
            data.extend_from_slice(&chunk);
        }

        tracing::debug!(url = %url, bytes = data.len(), mime = %mime_type, "Fetched media");
        let size_bytes = data.len() as u64;
        Ok(FetchedMedia {
            data,
            mime_type,
            size_bytes,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
