//! Raw GET transport used by the fetch multiplexer.
//!
//! The multiplexer owns scheduling (queueing, slots, completion, caching);
//! a [`Transport`] only knows how to move the bytes of one URI.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// One-shot GET of a URI into a caller-owned buffer
///
/// Bytes are appended to `body` as they arrive, so a transfer that fails
/// midway leaves the partial body in place for the caller.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Fetch `uri`, appending the response body to `body`
    async fn get(&self, uri: &str, body: &mut Vec<u8>) -> Result<()>;
}

/// Production [`Transport`] backed by a pooled reqwest client
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the HTTP client from the API settings
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, uri: &str, body: &mut Vec<u8>) -> Result<()> {
        let mut response = self.client.get(uri).send().await?;

        // Error pages are not item JSON; keep them out of the cache
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                uri: uri.to_string(),
            });
        }

        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
        }

        Ok(())
    }
}
